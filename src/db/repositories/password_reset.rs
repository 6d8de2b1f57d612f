use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use super::generate_hex_token;
use crate::entities::password_reset_tokens;

pub struct PasswordResetRepository {
    conn: DatabaseConnection,
}

impl PasswordResetRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Issue a one-time reset token for the user.
    pub async fn issue(
        &self,
        user_id: i32,
        ttl_minutes: i64,
    ) -> Result<password_reset_tokens::Model> {
        let now = Utc::now();

        let model = password_reset_tokens::ActiveModel {
            token: Set(generate_hex_token()),
            user_id: Set(user_id),
            expires_at: Set((now + Duration::minutes(ttl_minutes)).to_rfc3339()),
            used: Set(false),
            created_at: Set(now.to_rfc3339()),
            ..Default::default()
        };

        let inserted = model
            .insert(&self.conn)
            .await
            .context("Failed to insert password reset token")?;

        Ok(inserted)
    }

    pub async fn find(&self, token: &str) -> Result<Option<password_reset_tokens::Model>> {
        let row = password_reset_tokens::Entity::find()
            .filter(password_reset_tokens::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query password reset token")?;

        Ok(row)
    }

    /// One-time-use: once marked, the token is permanently rejected.
    pub async fn mark_used(&self, id: i64) -> Result<()> {
        let row = password_reset_tokens::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query password reset token")?
            .ok_or_else(|| anyhow::anyhow!("Password reset token {id} not found"))?;

        let mut active: password_reset_tokens::ActiveModel = row.into();
        active.used = Set(true);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Retention pass: drop tokens that are used or past expiry.
    pub async fn prune(&self) -> Result<u64> {
        let now = Utc::now().to_rfc3339();

        let result = password_reset_tokens::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(password_reset_tokens::Column::Used.eq(true))
                    .add(password_reset_tokens::Column::ExpiresAt.lt(now)),
            )
            .exec(&self.conn)
            .await
            .context("Failed to prune password reset tokens")?;

        Ok(result.rows_affected)
    }
}
