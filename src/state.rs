use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::rate_limit::RateLimiter;
use crate::config::Config;
use crate::db::Store;
use crate::services::{AccessTokenSigner, AuthService, Mailer, SeaOrmAuthService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub signer: AccessTokenSigner,

    pub rate_limiter: Arc<RateLimiter>,

    pub mailer: Arc<Mailer>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let signer = AccessTokenSigner::new(
            config.security.jwt_secret.clone(),
            config.security.access_token_ttl_minutes,
        );

        let mailer = Arc::new(Mailer::new());

        let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            mailer.clone(),
            config.security.clone(),
        ));

        let rate_limiter = Arc::new(RateLimiter::new());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            signer,
            rate_limiter,
            mailer,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
