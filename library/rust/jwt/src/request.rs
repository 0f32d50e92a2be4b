//! Authenticator が扱うリクエストの抽象と、検証済み Claims。

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// AuthContext は検証に成功したトークンの Claims を表す。
///
/// 生成後は変更できない。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AuthContext {
    claims: Map<String, Value>,
}

impl AuthContext {
    pub(crate) fn new(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// 指定 Claim の値を返す。
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// 指定 Claim を文字列として返す。
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// sub Claim を返す。
    pub fn subject(&self) -> Option<&str> {
        self.get_str("sub")
    }

    /// iat Claim を返す。
    pub fn issued_at(&self) -> Option<u64> {
        self.get("iat").and_then(Value::as_u64)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn into_claims(self) -> Map<String, Value> {
        self.claims
    }
}

/// AuthRequest は Authenticator が読み書きするリクエストの抽象。
///
/// 読み取るのは authorization ヘッダーのみ、書き込むのは認証成功時の auth のみ。
pub trait AuthRequest {
    /// authorization ヘッダーの値を返す。
    fn authorization(&self) -> Option<&str>;

    /// 検証済みの Claims を格納する。
    fn set_auth(&mut self, auth: AuthContext);
}

/// PipelineRequest はパイプラインで受け渡す最小限のリクエスト。
///
/// ヘッダー名は小文字で保持する。
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    header: HashMap<String, String>,
    auth: Option<AuthContext>,
}

impl PipelineRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// ヘッダーを追加する。
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.header.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.header
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// 認証済みの場合は Claims を返す。
    pub fn auth(&self) -> Option<&AuthContext> {
        self.auth.as_ref()
    }
}

impl AuthRequest for PipelineRequest {
    fn authorization(&self) -> Option<&str> {
        self.header("authorization")
    }

    fn set_auth(&mut self, auth: AuthContext) {
        self.auth = Some(auth);
    }
}

/// http::Request では AuthContext をリクエストエクステンションに格納する。
impl<B> AuthRequest for http::Request<B> {
    fn authorization(&self) -> Option<&str> {
        self.headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    fn set_auth(&mut self, auth: AuthContext) {
        self.extensions_mut().insert(auth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> AuthContext {
        let Value::Object(claims) = json!({"sub": "u1", "iat": 1_000, "x": 1}) else {
            unreachable!()
        };
        AuthContext::new(claims)
    }

    #[test]
    fn test_auth_context_accessors() {
        let ctx = context();
        assert_eq!(ctx.subject(), Some("u1"));
        assert_eq!(ctx.issued_at(), Some(1_000));
        assert_eq!(ctx.get("x"), Some(&json!(1)));
        assert!(ctx.get_str("x").is_none());
        assert_eq!(ctx.claims().len(), 3);
    }

    #[test]
    fn test_pipeline_request_header_is_case_insensitive() {
        let req = PipelineRequest::new().with_header("Authorization", "Bearer abc");
        assert_eq!(req.authorization(), Some("Bearer abc"));
        assert!(req.auth().is_none());
    }

    #[test]
    fn test_pipeline_request_set_auth() {
        let mut req = PipelineRequest::new();
        req.set_auth(context());
        assert_eq!(req.auth().and_then(AuthContext::subject), Some("u1"));
    }

    #[test]
    fn test_http_request_extensions() {
        let mut req = http::Request::builder()
            .header("authorization", "Bearer abc")
            .body(())
            .unwrap();
        assert_eq!(AuthRequest::authorization(&req), Some("Bearer abc"));

        req.set_auth(context());
        assert_eq!(
            req.extensions().get::<AuthContext>().and_then(AuthContext::subject),
            Some("u1")
        );
    }
}
