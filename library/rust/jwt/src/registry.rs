//! エグゼキューターレジストリ: 名前から Authenticator / Signer を生成する。

use crate::authenticator::Authenticator;
use crate::config::{ConfigProvider, JwtExecutorConfig};
use crate::signer::Signer;
use std::collections::BTreeMap;
use std::sync::Arc;

/// ExecutorType はホストパイプラインにおけるエグゼキューターの役割を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorType {
    /// リクエストを受け取り、加工して返す。
    RequestHandler,
    /// 他のエグゼキューターから呼び出されるサービス。
    Service,
}

/// ExecutorInfo はレジストリが公開するエグゼキューターの情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorInfo {
    pub name: &'static str,
    pub executor_type: ExecutorType,
}

/// Executor は生成されたエグゼキューター。
#[derive(Clone)]
pub enum Executor {
    Authenticator(Arc<Authenticator>),
    Signer(Arc<Signer>),
}

impl Executor {
    pub fn name(&self) -> &'static str {
        match self {
            Executor::Authenticator(_) => Authenticator::NAME,
            Executor::Signer(_) => Signer::NAME,
        }
    }

    pub fn executor_type(&self) -> ExecutorType {
        match self {
            Executor::Authenticator(_) => ExecutorType::RequestHandler,
            Executor::Signer(_) => ExecutorType::Service,
        }
    }

    pub fn as_authenticator(&self) -> Option<&Arc<Authenticator>> {
        match self {
            Executor::Authenticator(a) => Some(a),
            Executor::Signer(_) => None,
        }
    }

    pub fn as_signer(&self) -> Option<&Arc<Signer>> {
        match self {
            Executor::Signer(s) => Some(s),
            Executor::Authenticator(_) => None,
        }
    }
}

type Constructor =
    Box<dyn Fn(JwtExecutorConfig, Arc<dyn ConfigProvider>) -> Executor + Send + Sync>;

fn construct_authenticator(config: JwtExecutorConfig, provider: Arc<dyn ConfigProvider>) -> Executor {
    Executor::Authenticator(Arc::new(Authenticator::new(config, provider)))
}

fn construct_signer(config: JwtExecutorConfig, provider: Arc<dyn ConfigProvider>) -> Executor {
    Executor::Signer(Arc::new(Signer::new(config, provider)))
}

struct Registration {
    executor_type: ExecutorType,
    construct: Constructor,
}

/// ExecutorRegistry は名前とコンストラクターの対応表。
pub struct ExecutorRegistry {
    provider: Arc<dyn ConfigProvider>,
    registrations: BTreeMap<&'static str, Registration>,
}

impl ExecutorRegistry {
    /// Authenticator と Signer を登録したレジストリを生成する。
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        let mut registrations = BTreeMap::new();
        registrations.insert(
            Authenticator::NAME,
            Registration {
                executor_type: ExecutorType::RequestHandler,
                construct: Box::new(construct_authenticator),
            },
        );
        registrations.insert(
            Signer::NAME,
            Registration {
                executor_type: ExecutorType::Service,
                construct: Box::new(construct_signer),
            },
        );

        Self {
            provider,
            registrations,
        }
    }

    /// 登録済みエグゼキューターの一覧を返す。
    pub fn executor_infos(&self) -> Vec<ExecutorInfo> {
        self.registrations
            .iter()
            .map(|(name, reg)| ExecutorInfo {
                name: *name,
                executor_type: reg.executor_type,
            })
            .collect()
    }

    /// `config.name` のエグゼキューターを生成する。未知の名前なら None を返す。
    pub fn get_executor(&self, config: JwtExecutorConfig) -> Option<Executor> {
        let reg = self.registrations.get(config.name.as_str())?;
        Some((reg.construct)(config, self.provider.clone()))
    }

    /// 名前を指定してエグゼキューターを生成する。未知の名前なら None を返す。
    pub fn create(&self, name: &str, mut config: JwtExecutorConfig) -> Option<Executor> {
        name.clone_into(&mut config.name);
        self.get_executor(config)
    }
}
