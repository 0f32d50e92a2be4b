//! 署名・検証に使う鍵素材。

use secrecy::{ExposeSecret, Secret, SecretVec};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// SecretBytes は HMAC シークレットまたは PEM 鍵の生バイト列を保持する。
///
/// Debug 出力では中身を表示しない。clone は内部の Arc を共有する。
#[derive(Clone)]
pub struct SecretBytes(Arc<SecretVec<u8>>);

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(Secret::new(bytes.into())))
    }

    /// 鍵素材のバイト列を返す。
    pub fn expose(&self) -> &[u8] {
        self.0.expose_secret().as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// PEM 形式の鍵素材かどうかを返す。
    pub fn is_pem(&self) -> bool {
        let bytes = self.expose();
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        bytes[start..].starts_with(b"-----BEGIN")
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretBytes([REDACTED])")
    }
}

impl From<&str> for SecretBytes {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for SecretBytes {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl From<&[u8]> for SecretBytes {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl TryFrom<&serde_json::Value> for SecretBytes {
    type Error = String;

    /// 設定値（文字列またはバイト配列）から SecretBytes を生成する。
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        serde_json::from_value::<RawSecret>(value.clone())
            .map(Into::into)
            .map_err(|_| "expected a string or an array of bytes".to_string())
    }
}

/// 設定ファイル上のシークレット表現。
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSecret {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<RawSecret> for SecretBytes {
    fn from(raw: RawSecret) -> Self {
        match raw {
            RawSecret::Text(s) => s.into(),
            RawSecret::Bytes(b) => b.into(),
        }
    }
}

impl<'de> Deserialize<'de> for SecretBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawSecret::deserialize(deserializer).map(Into::into)
    }
}
