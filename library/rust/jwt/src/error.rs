//! JWT 検証・発行で発生するエラー定義。

use std::path::PathBuf;

/// ラップされた下位エラー。
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// JwtError は Authenticator / Signer / SecretResolver が返すエラーを表す。
#[derive(thiserror::Error, Debug)]
pub enum JwtError {
    /// Authorization ヘッダーが無い、または `Bearer ` で始まらない。
    #[error("missing or malformed bearer token")]
    MissingOrMalformedToken,

    /// インライン設定・証明書ファイル・ホスト設定のいずれからもシークレットが得られなかった。
    #[error("no jwt secret or cert provided")]
    NoSecretConfigured,

    /// 証明書/鍵ファイルの読み込みに失敗した。
    #[error("failed to read jwt cert file {}: {source}", .path.display())]
    SecretFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// トークンの検証に失敗した（署名不一致、期限切れ、不正な Claims、許可されないアルゴリズム等）。
    #[error("jwt verification failed: {reason}")]
    VerificationFailed {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// ペイロードの署名に失敗した。
    #[error("jwt signing failed: {reason}")]
    SigningFailed {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 設定値は存在するが期待する形式ではない。
    #[error("invalid jwt configuration for {key}: {reason}")]
    InvalidConfiguration { key: String, reason: String },
}

/// JwtErrorKind はログ・診断用の JwtError の種別タグ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwtErrorKind {
    MissingOrMalformedToken,
    NoSecretConfigured,
    SecretFileUnreadable,
    VerificationFailed,
    SigningFailed,
    InvalidConfiguration,
}

impl JwtErrorKind {
    /// ログフィールドに出力する種別名を返す。
    pub fn as_str(self) -> &'static str {
        match self {
            JwtErrorKind::MissingOrMalformedToken => "MissingOrMalformedToken",
            JwtErrorKind::NoSecretConfigured => "NoSecretConfigured",
            JwtErrorKind::SecretFileUnreadable => "SecretFileUnreadable",
            JwtErrorKind::VerificationFailed => "VerificationFailed",
            JwtErrorKind::SigningFailed => "SigningFailed",
            JwtErrorKind::InvalidConfiguration => "InvalidConfiguration",
        }
    }
}

impl std::fmt::Display for JwtErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JwtError {
    /// エラー種別を返す。
    pub fn kind(&self) -> JwtErrorKind {
        match self {
            JwtError::MissingOrMalformedToken => JwtErrorKind::MissingOrMalformedToken,
            JwtError::NoSecretConfigured => JwtErrorKind::NoSecretConfigured,
            JwtError::SecretFileUnreadable { .. } => JwtErrorKind::SecretFileUnreadable,
            JwtError::VerificationFailed { .. } => JwtErrorKind::VerificationFailed,
            JwtError::SigningFailed { .. } => JwtErrorKind::SigningFailed,
            JwtError::InvalidConfiguration { .. } => JwtErrorKind::InvalidConfiguration,
        }
    }

    /// ラップしている下位エラーが JwtError であればそれを返す。
    pub fn wrapped(&self) -> Option<&JwtError> {
        match self {
            JwtError::VerificationFailed {
                source: Some(source),
                ..
            }
            | JwtError::SigningFailed {
                source: Some(source),
                ..
            } => source.downcast_ref::<JwtError>(),
            _ => None,
        }
    }

    pub(crate) fn verification(err: jsonwebtoken::errors::Error) -> Self {
        JwtError::VerificationFailed {
            reason: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub(crate) fn verification_rejected(reason: impl Into<String>) -> Self {
        JwtError::VerificationFailed {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn signing(err: jsonwebtoken::errors::Error) -> Self {
        JwtError::SigningFailed {
            reason: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// 署名経路でのシークレット解決失敗を SigningFailed として包む。
    pub(crate) fn signing_wrapped(err: JwtError) -> Self {
        JwtError::SigningFailed {
            reason: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub(crate) fn signing_rejected(reason: impl Into<String>) -> Self {
        JwtError::SigningFailed {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_config(key: &str, reason: impl Into<String>) -> Self {
        JwtError::InvalidConfiguration {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// UnauthorizedError はリクエストパイプラインに返す認証失敗を表す。
///
/// パイプラインからは単一の「未認証」として見え、具体的な原因は `cause()` で参照できる。
#[derive(thiserror::Error, Debug)]
#[error("jwt authorization failed: {cause}")]
pub struct UnauthorizedError {
    #[source]
    cause: JwtError,
}

impl UnauthorizedError {
    pub fn new(cause: JwtError) -> Self {
        Self { cause }
    }

    /// 原因となった JwtError を返す。
    pub fn cause(&self) -> &JwtError {
        &self.cause
    }

    /// 原因の種別を返す。
    pub fn kind(&self) -> JwtErrorKind {
        self.cause.kind()
    }

    pub fn into_cause(self) -> JwtError {
        self.cause
    }
}

impl From<JwtError> for UnauthorizedError {
    fn from(cause: JwtError) -> Self {
        Self::new(cause)
    }
}
