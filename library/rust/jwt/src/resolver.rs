//! SecretResolver: エグゼキューター単位で鍵素材とオプションを一度だけ解決してキャッシュする。
//!
//! シークレットの解決順序:
//! 1. 生成時に渡されたインラインシークレット
//! 2. 生成時に渡された証明書/鍵ファイル（読み込み後はパスを破棄する）
//! 3. ホスト設定の `jwtCert`（ファイルパス）、次に `jwtSecret`
//!
//! 初回の解決は write ロック下で行い、同時に到着した呼び出しは同じ結果を待つ。

use crate::config::{ConfigProvider, JWT_CERT_KEY, JWT_SECRET_KEY};
use crate::error::JwtError;
use crate::secret::SecretBytes;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// SecretFileLoader は証明書/鍵ファイルの読み込みを抽象化するトレイト。
#[async_trait]
pub trait SecretFileLoader: Send + Sync {
    async fn load(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// FsSecretFileLoader はファイルシステムからバイナリとして読み込むデフォルト実装。
pub struct FsSecretFileLoader;

#[async_trait]
impl SecretFileLoader for FsSecretFileLoader {
    async fn load(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}

/// シークレットの解決状態。
enum SecretSlot {
    /// 未解決。インラインの証明書パスがあれば保持する。
    Pending { cert: Option<PathBuf> },
    /// 解決済み。以後変更しない。
    Resolved(SecretBytes),
}

/// SecretResolver は鍵素材とオプション `O` を遅延解決する。
pub struct SecretResolver<O> {
    secret: RwLock<SecretSlot>,
    options: RwLock<Option<O>>,
    options_key: &'static str,
    provider: Arc<dyn ConfigProvider>,
    loader: Arc<dyn SecretFileLoader>,
}

impl<O> SecretResolver<O>
where
    O: DeserializeOwned + Default + Clone + Send + Sync,
{
    /// 新しい SecretResolver を生成する。
    ///
    /// 空のインラインシークレットは未指定として扱う。
    pub fn new(
        secret: Option<SecretBytes>,
        cert: Option<PathBuf>,
        options: Option<O>,
        options_key: &'static str,
        provider: Arc<dyn ConfigProvider>,
    ) -> Self {
        let slot = match secret.filter(|s| !s.is_empty()) {
            Some(secret) => SecretSlot::Resolved(secret),
            None => SecretSlot::Pending { cert },
        };

        Self {
            secret: RwLock::new(slot),
            options: RwLock::new(options),
            options_key,
            provider,
            loader: Arc::new(FsSecretFileLoader),
        }
    }

    /// ファイルローダーを差し替える（テスト用）。
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn SecretFileLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// 鍵素材とオプションを解決して返す。
    pub async fn resolve(&self) -> Result<(SecretBytes, O), JwtError> {
        let secret = self.secret().await?;
        let options = self.options().await?;
        Ok((secret, options))
    }

    /// シークレットが解決済みかどうかを返す。
    pub async fn is_resolved(&self) -> bool {
        matches!(*self.secret.read().await, SecretSlot::Resolved(_))
    }

    /// 鍵素材を解決して返す。解決済みならキャッシュを返す。
    ///
    /// 失敗した場合はキャッシュしないため、次回呼び出しで再試行する。
    pub async fn secret(&self) -> Result<SecretBytes, JwtError> {
        {
            let slot = self.secret.read().await;
            if let SecretSlot::Resolved(ref secret) = *slot {
                return Ok(secret.clone());
            }
        }

        let mut slot = self.secret.write().await;

        // ダブルチェック: 先行した呼び出しが解決を完了しているかもしれない
        let cert = match *slot {
            SecretSlot::Resolved(ref secret) => return Ok(secret.clone()),
            SecretSlot::Pending { ref cert } => cert.clone(),
        };

        let secret = self.resolve_secret(cert).await?;
        *slot = SecretSlot::Resolved(secret.clone());

        Ok(secret)
    }

    /// オプションを解決して返す。明示値が無ければホスト設定を一度だけ参照する。
    pub async fn options(&self) -> Result<O, JwtError> {
        {
            let options = self.options.read().await;
            if let Some(ref options) = *options {
                return Ok(options.clone());
            }
        }

        let mut options = self.options.write().await;
        if let Some(ref options) = *options {
            return Ok(options.clone());
        }

        let resolved = match self.provider.get_config(self.options_key).await {
            None | Some(Value::Null) => O::default(),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| JwtError::invalid_config(self.options_key, e.to_string()))?,
        };
        debug!(key = self.options_key, "ホスト設定からオプションを解決しました");
        *options = Some(resolved.clone());

        Ok(resolved)
    }

    async fn resolve_secret(&self, cert: Option<PathBuf>) -> Result<SecretBytes, JwtError> {
        if let Some(path) = cert {
            let secret = self.read_file(&path).await?;
            if !secret.is_empty() {
                debug!(path = %path.display(), "証明書ファイルからシークレットを解決しました");
                return Ok(secret);
            }
        }

        if let Some(value) = self.lookup(JWT_CERT_KEY).await {
            let Value::String(path) = value else {
                return Err(JwtError::invalid_config(JWT_CERT_KEY, "expected a file path"));
            };
            let path = PathBuf::from(path);
            let secret = self.read_file(&path).await?;
            if !secret.is_empty() {
                debug!(path = %path.display(), "ホスト設定の証明書ファイルからシークレットを解決しました");
                return Ok(secret);
            }
        }

        if let Some(value) = self.lookup(JWT_SECRET_KEY).await {
            let secret = SecretBytes::try_from(&value)
                .map_err(|reason| JwtError::invalid_config(JWT_SECRET_KEY, reason))?;
            if !secret.is_empty() {
                debug!(key = JWT_SECRET_KEY, "ホスト設定からシークレットを解決しました");
                return Ok(secret);
            }
        }

        Err(JwtError::NoSecretConfigured)
    }

    async fn lookup(&self, key: &str) -> Option<Value> {
        self.provider
            .get_config(key)
            .await
            .filter(|v| !v.is_null())
    }

    async fn read_file(&self, path: &Path) -> Result<SecretBytes, JwtError> {
        match self.loader.load(path).await {
            Ok(bytes) => Ok(SecretBytes::new(bytes)),
            Err(source) => {
                error!(path = %path.display(), error = %source, "証明書ファイルの読み込みに失敗しました");
                Err(JwtError::SecretFileUnreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}
