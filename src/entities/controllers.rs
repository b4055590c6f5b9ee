use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "controllers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Device identifier the hardware publishes readings under.
    #[sea_orm(unique)]
    pub device_id: String,

    pub label: Option<String>,

    /// 5-digit claim handshake token. Retained after the first claim;
    /// uniqueness is only guaranteed among unclaimed controllers.
    pub pairing_code: Option<String>,

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
