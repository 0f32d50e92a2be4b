//! k1s0-jwt: JWT 認証 (Authenticator) と発行 (Signer) のエグゼキューター。
//!
//! 鍵素材はインラインシークレット、証明書/鍵ファイル、ホスト設定の順に遅延解決し、
//! エグゼキューター単位で一度だけキャッシュする。
//!
//! # 使い方
//!
//! ```no_run
//! use k1s0_jwt::{ExecutorRegistry, JwtExecutorConfig, PipelineRequest, StaticConfigProvider};
//! use std::sync::Arc;
//!
//! async fn issue_and_authenticate() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ExecutorRegistry::new(Arc::new(StaticConfigProvider::new()));
//!
//!     let signer = registry
//!         .create("Signer", JwtExecutorConfig::default().with_secret("s3cr3t"))
//!         .ok_or("Signer is not registered")?;
//!     let signer = signer.as_signer().ok_or("not a Signer")?;
//!     let token = signer.sign(&serde_json::json!({"sub": "u1"}), None, None).await?;
//!
//!     let auth = registry
//!         .create("Authenticator", JwtExecutorConfig::default().with_secret("s3cr3t"))
//!         .ok_or("Authenticator is not registered")?;
//!     let auth = auth.as_authenticator().ok_or("not an Authenticator")?;
//!     let req = PipelineRequest::new().with_header("authorization", &format!("Bearer {token}"));
//!     let req = auth.authenticate(req).await?;
//!     assert_eq!(req.auth().and_then(|a| a.subject()), Some("u1"));
//!     Ok(())
//! }
//! ```

pub mod authenticator;
pub mod config;
pub mod error;
pub mod middleware;
pub mod options;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod secret;
pub mod signer;

pub use authenticator::{extract_bearer_token, verify_token, Authenticator, BEARER_PREFIX};
pub use config::{
    ConfigError, ConfigProvider, JwtExecutorConfig, StaticConfigProvider, YamlConfigProvider,
};
pub use error::{JwtError, JwtErrorKind, UnauthorizedError};
pub use middleware::{get_auth_context, jwt_auth_middleware};
pub use options::{OneOrMany, SignOptions, VerifyOptions};
pub use registry::{Executor, ExecutorInfo, ExecutorRegistry, ExecutorType};
pub use request::{AuthContext, AuthRequest, PipelineRequest};
pub use resolver::{FsSecretFileLoader, SecretFileLoader, SecretResolver};
pub use secret::SecretBytes;
pub use signer::{sign_payload, Signer};

#[cfg(feature = "mock")]
pub use config::MockConfigProvider;
