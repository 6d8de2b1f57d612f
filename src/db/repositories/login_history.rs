use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::login_history;

/// One audit event to be appended.
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub user_id: Option<i32>,
    pub email: String,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub event: String,
    pub ip: String,
    pub user_agent: String,
    pub device: String,
    pub browser: String,
}

pub struct LoginHistoryRepository {
    conn: DatabaseConnection,
}

impl LoginHistoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Append one row. The trail is never updated or deleted from the
    /// application side.
    pub async fn record(&self, event: LoginEvent) -> Result<()> {
        let model = login_history::ActiveModel {
            user_id: Set(event.user_id),
            email: Set(event.email),
            success: Set(event.success),
            failure_reason: Set(event.failure_reason),
            event: Set(event.event),
            ip: Set(event.ip),
            user_agent: Set(event.user_agent),
            device: Set(event.device),
            browser: Set(event.browser),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        login_history::Entity::insert(model)
            .exec(&self.conn)
            .await
            .context("Failed to insert login history entry")?;

        Ok(())
    }

    pub async fn recent_for_email(
        &self,
        email: &str,
        limit: u64,
    ) -> Result<Vec<login_history::Model>> {
        let rows = login_history::Entity::find()
            .filter(login_history::Column::Email.eq(email))
            .order_by_desc(login_history::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query login history")?;

        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64> {
        let count = login_history::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count login history")?;

        Ok(count)
    }
}
