use anyhow::{Context, Result};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::audit_log;

/// Optional filters for the audit listing; all are ANDed.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub actor_id: Option<i32>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
}

pub struct AuditRepository {
    conn: DatabaseConnection,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &self,
        actor_id: Option<i32>,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        metadata: Option<serde_json::Value>,
        ip_address: Option<&str>,
    ) -> Result<()> {
        let active = audit_log::ActiveModel {
            actor_id: Set(actor_id),
            action: Set(action.to_string()),
            entity_type: Set(entity_type.to_string()),
            entity_id: Set(entity_id.map(ToString::to_string)),
            metadata: Set(metadata.map(|m| m.to_string())),
            ip_address: Set(ip_address.map(ToString::to_string)),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        audit_log::Entity::insert(active)
            .exec(&self.conn)
            .await
            .context("Failed to append audit entry")?;
        Ok(())
    }

    /// Newest-first page plus the total matching row count.
    pub async fn list(
        &self,
        filter: &AuditFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<audit_log::Model>, u64)> {
        let mut query = audit_log::Entity::find()
            .order_by_desc(audit_log::Column::CreatedAt)
            .order_by_desc(audit_log::Column::Id);

        if let Some(actor_id) = filter.actor_id {
            query = query.filter(audit_log::Column::ActorId.eq(actor_id));
        }
        if let Some(action) = &filter.action {
            query = query.filter(audit_log::Column::Action.eq(action.clone()));
        }
        if let Some(entity_type) = &filter.entity_type {
            query = query.filter(audit_log::Column::EntityType.eq(entity_type.clone()));
        }
        if let Some(entity_id) = &filter.entity_id {
            query = query.filter(audit_log::Column::EntityId.eq(entity_id.clone()));
        }

        let paginator = query.paginate(&self.conn, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }

    pub async fn purge_all(&self) -> Result<u64> {
        let result = audit_log::Entity::delete_many().exec(&self.conn).await?;
        Ok(result.rows_affected)
    }

    /// Deletes entries with `created_at < before`. RFC 3339 strings
    /// compare chronologically, so a plain column comparison suffices.
    pub async fn purge_before(&self, before: &str) -> Result<u64> {
        let result = audit_log::Entity::delete_many()
            .filter(audit_log::Column::CreatedAt.lt(before))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn count(&self) -> Result<u64> {
        let count = audit_log::Entity::find().count(&self.conn).await?;
        Ok(count)
    }
}
