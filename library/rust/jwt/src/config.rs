//! ホスト設定の参照と、エグゼキューター生成時の設定構造体。

use crate::options::{SignOptions, VerifyOptions};
use crate::secret::SecretBytes;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// インラインの HMAC シークレット / 鍵素材。
pub const JWT_SECRET_KEY: &str = "jwtSecret";
/// 証明書/鍵ファイルのパス。
pub const JWT_CERT_KEY: &str = "jwtCert";
/// Authenticator の検証オプション。
pub const JWT_VERIFY_OPTIONS_KEY: &str = "jwtVerifyOptions";
/// Signer の署名オプション。
pub const JWT_SIGN_OPTIONS_KEY: &str = "jwtSignOptions";

/// ConfigProvider はホストの実行時設定を参照するトレイト。
///
/// エグゼキューターの設定に値が無い場合のみ問い合わせる。
#[async_trait]
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait ConfigProvider: Send + Sync {
    async fn get_config(&self, key: &str) -> Option<Value>;
}

/// StaticConfigProvider はメモリ上のマップを返す ConfigProvider。
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    values: HashMap<String, Value>,
}

impl StaticConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 設定値を追加する。
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn get_config(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("top-level YAML value must be a mapping")]
    NotAMapping,
}

/// YamlConfigProvider は YAML ドキュメントのトップレベルキーを参照する ConfigProvider。
#[derive(Debug, Clone, Default)]
pub struct YamlConfigProvider {
    values: serde_json::Map<String, Value>,
}

impl YamlConfigProvider {
    /// YAML ファイルを読み込む。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&data)
    }

    /// YAML 文字列から生成する。
    pub fn from_yaml_str(data: &str) -> Result<Self, ConfigError> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_yaml::from_str::<Value>(data)? {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            _ => Err(ConfigError::NotAMapping),
        }
    }
}

#[async_trait]
impl ConfigProvider for YamlConfigProvider {
    async fn get_config(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

/// JwtExecutorConfig は Authenticator / Signer 生成時に渡す設定を表す。
///
/// ここに指定されたキーはホスト設定より優先される。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JwtExecutorConfig {
    /// エグゼキューター名（`Authenticator` または `Signer`）。
    pub name: String,

    pub jwt_secret: Option<SecretBytes>,

    pub jwt_cert: Option<PathBuf>,

    pub jwt_verify_options: Option<VerifyOptions>,

    pub jwt_sign_options: Option<SignOptions>,
}

impl JwtExecutorConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<SecretBytes>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    pub fn with_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.jwt_cert = Some(path.into());
        self
    }

    pub fn with_verify_options(mut self, options: VerifyOptions) -> Self {
        self.jwt_verify_options = Some(options);
        self
    }

    pub fn with_sign_options(mut self, options: SignOptions) -> Self {
        self.jwt_sign_options = Some(options);
        self
    }
}
