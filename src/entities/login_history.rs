use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only authentication audit trail. Rows are never updated or
/// deleted by application logic.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "login_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// NULL when the attempted email matches no account.
    pub user_id: Option<i32>,

    pub email: String,

    pub success: bool,

    pub failure_reason: Option<String>,

    /// LOGIN, LOGOUT, LOGOUT_ALL or RESET_SENHA.
    pub event: String,

    pub ip: String,

    pub user_agent: String,

    pub device: String,

    pub browser: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
