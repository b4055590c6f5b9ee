use sea_orm::entity::prelude::*;

/// Ownership assignment between a user and a controller. The
/// `(user_id, controller_id)` pair carries a unique index; the database
/// is the final arbiter against duplicate claims.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_controllers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    pub controller_id: i32,

    /// Per-assignment display label override.
    pub label: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::controllers::Entity",
        from = "Column::ControllerId",
        to = "super::controllers::Column::Id"
    )]
    Controller,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::controllers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Controller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
