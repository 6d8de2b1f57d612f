use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{login_history, password_reset_tokens, refresh_tokens};

pub mod migrator;
pub mod repositories;

pub use repositories::login_history::LoginEvent;
pub use repositories::user::UserAccount;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn refresh_token_repo(&self) -> repositories::refresh_token::RefreshTokenRepository {
        repositories::refresh_token::RefreshTokenRepository::new(self.conn.clone())
    }

    fn password_reset_repo(&self) -> repositories::password_reset::PasswordResetRepository {
        repositories::password_reset::PasswordResetRepository::new(self.conn.clone())
    }

    fn login_history_repo(&self) -> repositories::login_history::LoginHistoryRepository {
        repositories::login_history::LoginHistoryRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_email_with_password(
        &self,
        email: &str,
    ) -> Result<Option<(UserAccount, Option<String>)>> {
        self.user_repo().get_by_email_with_password(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<UserAccount>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
        profile_id: i32,
        company_id: Option<i32>,
        config: &SecurityConfig,
    ) -> Result<UserAccount> {
        self.user_repo()
            .create(email, password, name, profile_id, company_id, config)
            .await
    }

    pub async fn update_user_password(
        &self,
        user_id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(user_id, new_password, config)
            .await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    // ========== Refresh tokens ==========

    pub async fn create_refresh_token(
        &self,
        user_id: i32,
        ttl_days: i64,
        ip: &str,
        user_agent: &str,
        device: &str,
    ) -> Result<refresh_tokens::Model> {
        self.refresh_token_repo()
            .create(user_id, ttl_days, ip, user_agent, device)
            .await
    }

    pub async fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<refresh_tokens::Model>> {
        self.refresh_token_repo().validate(token).await
    }

    pub async fn invalidate_refresh_token(&self, token: &str) -> Result<()> {
        self.refresh_token_repo().invalidate(token).await
    }

    pub async fn invalidate_all_refresh_tokens(&self, user_id: i32) -> Result<()> {
        self.refresh_token_repo()
            .invalidate_all_for_user(user_id)
            .await
    }

    pub async fn count_active_refresh_tokens_for_user(&self, user_id: i32) -> Result<u64> {
        self.refresh_token_repo()
            .count_active_for_user(user_id)
            .await
    }

    pub async fn count_active_refresh_tokens(&self) -> Result<u64> {
        self.refresh_token_repo().count_active().await
    }

    pub async fn cleanup_refresh_tokens(&self, retention_days: i64) -> Result<u64> {
        self.refresh_token_repo()
            .delete_expired_and_stale(retention_days)
            .await
    }

    // ========== Password reset tokens ==========

    pub async fn issue_reset_token(
        &self,
        user_id: i32,
        ttl_minutes: i64,
    ) -> Result<password_reset_tokens::Model> {
        self.password_reset_repo().issue(user_id, ttl_minutes).await
    }

    pub async fn find_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<password_reset_tokens::Model>> {
        self.password_reset_repo().find(token).await
    }

    pub async fn mark_reset_token_used(&self, id: i64) -> Result<()> {
        self.password_reset_repo().mark_used(id).await
    }

    pub async fn prune_reset_tokens(&self) -> Result<u64> {
        self.password_reset_repo().prune().await
    }

    // ========== Login history ==========

    pub async fn record_login_event(&self, event: LoginEvent) -> Result<()> {
        self.login_history_repo().record(event).await
    }

    pub async fn recent_login_events_for_email(
        &self,
        email: &str,
        limit: u64,
    ) -> Result<Vec<login_history::Model>> {
        self.login_history_repo()
            .recent_for_email(email, limit)
            .await
    }

    pub async fn count_login_events(&self) -> Result<u64> {
        self.login_history_repo().count().await
    }
}
