use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Canonical role: "user", "admin" or "dev".
    pub role: String,

    /// Legacy flag; may have been set independently of `role` by an old
    /// migration or API call. Consulted during normalization only.
    pub is_admin: bool,

    /// Legacy flag, same caveat as `is_admin`.
    pub is_dev: bool,

    pub must_change_password: bool,

    /// User id of the inviting account, if this one was created by invite.
    pub invited_by: Option<i32>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_controllers::Entity")]
    UserControllers,
}

impl Related<super::user_controllers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserControllers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
