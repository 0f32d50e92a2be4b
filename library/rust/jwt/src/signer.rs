//! Signer: 任意のペイロードに署名してトークンを発行するサービス。

use crate::config::{ConfigProvider, JwtExecutorConfig, JWT_SIGN_OPTIONS_KEY};
use crate::error::JwtError;
use crate::options::SignOptions;
use crate::resolver::{SecretFileLoader, SecretResolver};
use crate::secret::SecretBytes;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Signer は JWT を発行する。リクエストには関与しない。
pub struct Signer {
    resolver: SecretResolver<SignOptions>,
}

impl Signer {
    /// レジストリに登録する名前。
    pub const NAME: &'static str = "Signer";

    /// 設定とホスト設定プロバイダーから Signer を生成する。
    pub fn new(config: JwtExecutorConfig, provider: Arc<dyn ConfigProvider>) -> Self {
        Self {
            resolver: SecretResolver::new(
                config.jwt_secret,
                config.jwt_cert,
                config.jwt_sign_options,
                JWT_SIGN_OPTIONS_KEY,
                provider,
            ),
        }
    }

    /// 証明書ファイルのローダーを差し替える（テスト用）。
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn SecretFileLoader>) -> Self {
        self.resolver = self.resolver.with_loader(loader);
        self
    }

    /// 鍵素材とオプションのキャッシュ。
    #[cfg(test)]
    pub(crate) fn resolver(&self) -> &SecretResolver<SignOptions> {
        &self.resolver
    }

    /// ペイロードに署名し、compact 形式のトークンを返す。
    ///
    /// `secret` を渡した場合はその呼び出しに限りシークレット解決を行わない
    /// （インスタンスのキャッシュには影響しない）。`options` も同様に呼び出し単位で優先する。
    pub async fn sign<P>(
        &self,
        payload: &P,
        secret: Option<&SecretBytes>,
        options: Option<&SignOptions>,
    ) -> Result<String, JwtError>
    where
        P: Serialize + ?Sized + Sync,
    {
        let secret = match secret {
            Some(secret) if secret.is_empty() => return Err(JwtError::NoSecretConfigured),
            Some(secret) => secret.clone(),
            None => self.resolver.secret().await.map_err(|err| match err {
                JwtError::SecretFileUnreadable { .. } => JwtError::signing_wrapped(err),
                other => other,
            })?,
        };
        let options = match options {
            Some(options) => options.clone(),
            None => self.resolver.options().await?,
        };

        let token = sign_payload(payload, &secret, &options)?;
        debug!(alg = ?options.algorithm, "JWT を発行しました");
        Ok(token)
    }
}

/// 鍵素材と署名オプションでペイロードに署名する。
pub fn sign_payload<P>(
    payload: &P,
    secret: &SecretBytes,
    options: &SignOptions,
) -> Result<String, JwtError>
where
    P: Serialize + ?Sized,
{
    let payload =
        serde_json::to_value(payload).map_err(|e| JwtError::signing_rejected(e.to_string()))?;
    let claims = options.apply_claims(payload, jsonwebtoken::get_current_timestamp())?;
    let key = encoding_key(options.algorithm, secret)?;

    jsonwebtoken::encode(&options.header(), &claims, &key).map_err(JwtError::signing)
}

fn encoding_key(algorithm: Algorithm, secret: &SecretBytes) -> Result<EncodingKey, JwtError> {
    let key = match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Ok(EncodingKey::from_secret(secret.expose()));
        }
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => EncodingKey::from_rsa_pem(secret.expose()),
        Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(secret.expose()),
        Algorithm::EdDSA => EncodingKey::from_ed_pem(secret.expose()),
    };
    key.map_err(JwtError::signing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JwtErrorKind;
    use serde_json::json;

    #[test]
    fn test_sign_payload_produces_three_segments() {
        let token = sign_payload(
            &json!({"sub": "u1"}),
            &SecretBytes::from("s3cr3t"),
            &SignOptions::default(),
        )
        .unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn test_sign_payload_rsa_with_hmac_secret_fails() {
        let options = SignOptions {
            algorithm: Algorithm::RS256,
            ..Default::default()
        };
        let err = sign_payload(&json!({"sub": "u1"}), &SecretBytes::from("s3cr3t"), &options)
            .unwrap_err();
        assert_eq!(err.kind(), JwtErrorKind::SigningFailed);
    }

    #[test]
    fn test_sign_payload_rejects_non_object() {
        let err = sign_payload(&[1, 2, 3], &SecretBytes::from("s3cr3t"), &SignOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), JwtErrorKind::SigningFailed);
    }
}
