use anyhow::{Context, Result};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{controllers, user_controllers};

pub struct ControllerRepository {
    conn: DatabaseConnection,
}

impl ControllerRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        device_id: &str,
        label: Option<&str>,
        pairing_code: &str,
    ) -> Result<controllers::Model> {
        let active = controllers::ActiveModel {
            device_id: Set(device_id.to_string()),
            label: Set(label.map(ToString::to_string)),
            pairing_code: Set(Some(pairing_code.to_string())),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(model)
    }

    pub async fn get(&self, id: i32) -> Result<Option<controllers::Model>> {
        let controller = controllers::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query controller by ID")?;

        Ok(controller)
    }

    pub async fn list(&self) -> Result<Vec<controllers::Model>> {
        let controllers = controllers::Entity::find()
            .order_by_asc(controllers::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list controllers")?;

        Ok(controllers)
    }

    /// All controllers carrying this pairing code, unclaimed ones first.
    /// Generation keeps codes unique among unclaimed controllers, so at
    /// most one entry here can still be unclaimed.
    pub async fn find_by_code(&self, code: &str) -> Result<Vec<(controllers::Model, bool)>> {
        let matches = controllers::Entity::find()
            .filter(controllers::Column::PairingCode.eq(code))
            .order_by_asc(controllers::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to query controllers by pairing code")?;

        let mut out = Vec::with_capacity(matches.len());
        for controller in matches {
            let claimed = user_controllers::Entity::find()
                .filter(user_controllers::Column::ControllerId.eq(controller.id))
                .one(&self.conn)
                .await
                .context("Failed to check controller claim state")?
                .is_some();
            out.push((controller, claimed));
        }
        out.sort_by_key(|(_, claimed)| *claimed);

        Ok(out)
    }

    /// True if an *unclaimed* controller already holds this code.
    /// Claimed controllers' codes are considered free for reuse.
    pub async fn code_in_use(&self, code: &str) -> Result<bool> {
        let hit = controllers::Entity::find()
            .filter(controllers::Column::PairingCode.eq(code))
            .filter(
                controllers::Column::Id.not_in_subquery(
                    Query::select()
                        .column(user_controllers::Column::ControllerId)
                        .from(user_controllers::Entity)
                        .to_owned(),
                ),
            )
            .one(&self.conn)
            .await
            .context("Failed to check pairing code usage")?;

        Ok(hit.is_some())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        // Assignments referencing the controller go with it.
        user_controllers::Entity::delete_many()
            .filter(user_controllers::Column::ControllerId.eq(id))
            .exec(&self.conn)
            .await?;

        let result = controllers::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self) -> Result<u64> {
        use sea_orm::PaginatorTrait;
        let count = controllers::Entity::find().count(&self.conn).await?;
        Ok(count)
    }
}
