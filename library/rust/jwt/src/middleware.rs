//! axum 用の JWT 認証ミドルウェア。

use crate::authenticator::Authenticator;
use crate::error::UnauthorizedError;
use crate::request::AuthContext;
use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// jwt_auth_middleware は Authenticator でリクエストを認証するミドルウェア。
/// 検証成功時は AuthContext をリクエストエクステンションに格納する。
pub async fn jwt_auth_middleware(
    State(authenticator): State<Arc<Authenticator>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, UnauthorizedError> {
    let req = authenticator.authenticate(req).await?;
    Ok(next.run(req).await)
}

/// リクエストエクステンションから AuthContext を取得する。
pub fn get_auth_context(req: &Request<Body>) -> Option<&AuthContext> {
    req.extensions().get::<AuthContext>()
}

/// 原因の種別に関わらず 401 を返す。種別はログにのみ出力される。
impl IntoResponse for UnauthorizedError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "SYS_AUTH_UNAUTHENTICATED",
            "message": "認証が必要です",
        });

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}
