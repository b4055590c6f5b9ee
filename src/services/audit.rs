use tracing::warn;

use crate::db::Store;

/// Best-effort audit trail writer.
///
/// A failed write is logged and swallowed: auditing is a side effect of
/// the primary operation and must never turn its success into an error.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Store,
}

impl AuditRecorder {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        actor_id: Option<i32>,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        metadata: Option<serde_json::Value>,
        ip_address: Option<&str>,
    ) {
        match self
            .store
            .append_audit(actor_id, action, entity_type, entity_id, metadata, ip_address)
            .await
        {
            Ok(()) => {
                metrics::counter!("audit_entries_total", &[("action", action.to_string())])
                    .increment(1);
            }
            Err(e) => {
                warn!(action, error = %e, "Failed to record audit entry");
            }
        }
    }
}
