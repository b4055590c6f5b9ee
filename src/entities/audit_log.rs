use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Append-only record of a privileged action. Rows are never updated;
/// the only deletions are the dev-only purge operations.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Null means the system itself acted.
    pub actor_id: Option<i32>,

    /// Dotted action tag, e.g. "user.login", "controller.claim".
    pub action: String,

    pub entity_type: String,

    pub entity_id: Option<String>,

    /// Opaque structured payload, serialized JSON.
    pub metadata: Option<String>,

    pub ip_address: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
