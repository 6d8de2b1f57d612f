use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};

use super::generate_hex_token;
use crate::entities::refresh_tokens;

pub struct RefreshTokenRepository {
    conn: DatabaseConnection,
}

impl RefreshTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Create a fresh token for the user, deactivating every token the
    /// user currently holds first (single active session per user).
    ///
    /// Two concurrent creates race on the deactivate-then-insert
    /// sequence; the last insert to commit wins as the active session.
    pub async fn create(
        &self,
        user_id: i32,
        ttl_days: i64,
        ip: &str,
        user_agent: &str,
        device: &str,
    ) -> Result<refresh_tokens::Model> {
        self.invalidate_all_for_user(user_id).await?;

        let now = Utc::now();
        let token = generate_hex_token();

        let model = refresh_tokens::ActiveModel {
            token: Set(token),
            user_id: Set(user_id),
            expires_at: Set((now + Duration::days(ttl_days)).to_rfc3339()),
            active: Set(true),
            ip: Set(ip.to_string()),
            user_agent: Set(user_agent.to_string()),
            device: Set(device.to_string()),
            created_at: Set(now.to_rfc3339()),
            last_used_at: Set(None),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert refresh token")?;

        Ok(inserted)
    }

    /// Look up a token and return it only when it is active and not
    /// expired. A token found inactive or past its expiry is defensively
    /// deactivated before `None` is returned.
    pub async fn validate(&self, token: &str) -> Result<Option<refresh_tokens::Model>> {
        let row = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query refresh token")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expired = DateTime::parse_from_rfc3339(&row.expires_at)
            .map(|exp| exp < Utc::now())
            .unwrap_or(true);

        if !row.active || expired {
            let mut active: refresh_tokens::ActiveModel = row.into();
            active.active = Set(false);
            active.update(&self.conn).await?;
            return Ok(None);
        }

        let mut touched: refresh_tokens::ActiveModel = row.into();
        touched.last_used_at = Set(Some(Utc::now().to_rfc3339()));
        let row = touched.update(&self.conn).await?;

        Ok(Some(row))
    }

    /// Mark one token inactive. Deletion is deferred to the retention job.
    pub async fn invalidate(&self, token: &str) -> Result<()> {
        refresh_tokens::Entity::update_many()
            .col_expr(
                refresh_tokens::Column::Active,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(refresh_tokens::Column::Token.eq(token))
            .exec(&self.conn)
            .await
            .context("Failed to invalidate refresh token")?;

        Ok(())
    }

    /// Mark every token of the user inactive.
    pub async fn invalidate_all_for_user(&self, user_id: i32) -> Result<()> {
        refresh_tokens::Entity::update_many()
            .col_expr(
                refresh_tokens::Column::Active,
                sea_orm::sea_query::Expr::value(false),
            )
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::Active.eq(true))
            .exec(&self.conn)
            .await
            .context("Failed to invalidate user refresh tokens")?;

        Ok(())
    }

    pub async fn count_active_for_user(&self, user_id: i32) -> Result<u64> {
        let count = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::Active.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count active refresh tokens")?;

        Ok(count)
    }

    pub async fn count_active(&self) -> Result<u64> {
        let count = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::Active.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count active refresh tokens")?;

        Ok(count)
    }

    /// Retention pass: delete tokens past their expiry, plus inactive
    /// tokens untouched for longer than `retention_days`. Idempotent;
    /// rows already gone are simply not matched.
    pub async fn delete_expired_and_stale(&self, retention_days: i64) -> Result<u64> {
        let now = Utc::now();
        let stale_cutoff = (now - Duration::days(retention_days)).to_rfc3339();

        let result = refresh_tokens::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(refresh_tokens::Column::ExpiresAt.lt(now.to_rfc3339()))
                    .add(
                        Condition::all()
                            .add(refresh_tokens::Column::Active.eq(false))
                            .add(refresh_tokens::Column::CreatedAt.lt(stale_cutoff)),
                    ),
            )
            .exec(&self.conn)
            .await
            .context("Failed to prune refresh tokens")?;

        Ok(result.rows_affected)
    }
}
