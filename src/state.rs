use std::sync::Arc;

use crate::accounts::AccountService;
use crate::auth::{jwt::JwtKeys, password::PasswordHasher};
use crate::config::AppConfig;
use crate::users::{PgUserStore, UserStore};

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub accounts: AccountService,
}

impl AppState {
    /// Connects to the database and wires up the account service.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = PgUserStore::connect(&config).await?;
        Self::from_parts(Arc::new(config), Arc::new(store))
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let hasher = PasswordHasher::new(config.password)?;
        let keys = JwtKeys::new(&config.jwt);
        Ok(Self {
            accounts: AccountService::new(store, hasher, keys),
            config,
        })
    }

    #[cfg(test)]
    pub(crate) fn fake_with_store(store: Arc<dyn UserStore>) -> Self {
        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            mode: "test".into(),
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 60,
            },
            password: crate::config::PasswordConfig {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
        });
        Self::from_parts(config, store).expect("fake state")
    }

    #[cfg(test)]
    pub(crate) fn fake() -> Self {
        Self::fake_with_store(Arc::new(crate::users::MemoryUserStore::new()))
    }
}
