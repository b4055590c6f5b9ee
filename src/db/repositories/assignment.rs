use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{controllers, user_controllers};

/// An assignment row joined with the controller it points at; what the
/// "my devices" listing renders.
#[derive(Debug, Clone)]
pub struct AssignmentDetail {
    pub assignment: user_controllers::Model,
    pub controller: controllers::Model,
}

pub struct AssignmentRepository {
    conn: DatabaseConnection,
}

impl AssignmentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert the (user, controller) ownership row. A duplicate pair
    /// violates the unique index and surfaces as a database error the
    /// API layer translates to a conflict.
    pub async fn assign(
        &self,
        user_id: i32,
        controller_id: i32,
        label: Option<&str>,
    ) -> Result<user_controllers::Model> {
        let active = user_controllers::ActiveModel {
            user_id: Set(user_id),
            controller_id: Set(controller_id),
            label: Set(label.map(ToString::to_string)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(model)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<AssignmentDetail>> {
        let rows = user_controllers::Entity::find()
            .filter(user_controllers::Column::UserId.eq(user_id))
            .find_also_related(controllers::Entity)
            .order_by_asc(user_controllers::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list assignments for user")?;

        Ok(rows
            .into_iter()
            .filter_map(|(assignment, controller)| {
                controller.map(|controller| AssignmentDetail {
                    assignment,
                    controller,
                })
            })
            .collect())
    }

    pub async fn update_label(
        &self,
        user_id: i32,
        controller_id: i32,
        label: Option<&str>,
    ) -> Result<Option<user_controllers::Model>> {
        let Some(row) = user_controllers::Entity::find()
            .filter(user_controllers::Column::UserId.eq(user_id))
            .filter(user_controllers::Column::ControllerId.eq(controller_id))
            .one(&self.conn)
            .await
            .context("Failed to query assignment for relabel")?
        else {
            return Ok(None);
        };

        let mut active: user_controllers::ActiveModel = row.into();
        active.label = Set(label.map(ToString::to_string));
        let updated = active.update(&self.conn).await?;

        Ok(Some(updated))
    }

    pub async fn remove(&self, user_id: i32, controller_id: i32) -> Result<bool> {
        let result = user_controllers::Entity::delete_many()
            .filter(user_controllers::Column::UserId.eq(user_id))
            .filter(user_controllers::Column::ControllerId.eq(controller_id))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Device ids of every controller the user owns; the access scope
    /// for non-privileged readings queries.
    pub async fn owned_device_ids(&self, user_id: i32) -> Result<Vec<String>> {
        let rows = user_controllers::Entity::find()
            .filter(user_controllers::Column::UserId.eq(user_id))
            .find_also_related(controllers::Entity)
            .all(&self.conn)
            .await
            .context("Failed to resolve owned devices")?;

        let mut device_ids: Vec<String> = rows
            .into_iter()
            .filter_map(|(_, controller)| controller.map(|c| c.device_id))
            .collect();
        device_ids.sort();
        device_ids.dedup();

        Ok(device_ids)
    }

    pub async fn owns_device(&self, user_id: i32, device_id: &str) -> Result<bool> {
        let hit = user_controllers::Entity::find()
            .filter(user_controllers::Column::UserId.eq(user_id))
            .find_also_related(controllers::Entity)
            .filter(controllers::Column::DeviceId.eq(device_id))
            .limit(1)
            .all(&self.conn)
            .await
            .context("Failed to check device ownership")?;

        Ok(!hit.is_empty())
    }
}
