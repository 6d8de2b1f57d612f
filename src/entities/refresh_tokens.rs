use sea_orm::entity::prelude::*;

/// Opaque refresh token. At most one row per user may have
/// `active = true`; rotated-out, logged-out and expired tokens stay
/// inactive until the retention job deletes them.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// 64-char hex string (256 bits of randomness).
    #[sea_orm(unique)]
    pub token: String,

    pub user_id: i32,

    pub expires_at: String,

    pub active: bool,

    pub ip: String,

    pub user_agent: String,

    /// Label derived from the user agent, e.g. "Windows - Chrome".
    pub device: String,

    pub created_at: String,

    pub last_used_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
