use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;

use super::requester::{client_ip, require_dev};
use super::validation::{validate_limit, validate_page, validate_timestamp};
use super::{ApiError, ApiResponse, AppState, AuditPage, PaginationDto, PurgeAuditRequest};
use crate::db::AuditFilter;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListParams {
    pub actor_id: Option<i32>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list_audit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<AuditListParams>,
) -> Result<Json<ApiResponse<AuditPage>>, ApiError> {
    require_dev(&state, &headers).await?;

    let page = validate_page(params.page)?;
    let limit = validate_limit(params.limit)?;

    let filter = AuditFilter {
        actor_id: params.actor_id,
        action: params.action,
        entity_type: params.entity_type,
        entity_id: params.entity_id,
    };

    let (entries, total) = state.store.list_audit(&filter, page, limit).await?;

    Ok(Json(ApiResponse::success(AuditPage {
        entries,
        pagination: PaginationDto::new(page, limit, total),
    })))
}

/// Mass deletion needs an explicit, unambiguous instruction: exactly
/// one of `all: true` or `before` must be present.
pub async fn purge_audit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<PurgeAuditRequest>,
) -> Result<Json<ApiResponse<u64>>, ApiError> {
    let actor = require_dev(&state, &headers).await?;

    let purge_all = payload.all.unwrap_or(false);

    let deleted = match (purge_all, payload.before.as_deref()) {
        (true, None) => state.store.purge_audit_all().await?,
        (false, Some(before)) => {
            let before = validate_timestamp(before)?;
            state.store.purge_audit_before(&before).await?
        }
        (true, Some(_)) => {
            return Err(ApiError::validation(
                "Specify either all=true or before, not both",
            ));
        }
        (false, None) => {
            return Err(ApiError::validation(
                "Specify either all=true or a before timestamp",
            ));
        }
    };

    // Recorded after the purge so purge-all still leaves its own trail.
    state
        .audit
        .record(
            Some(actor.id),
            "audit.purge",
            "audit_log",
            None,
            Some(serde_json::json!({
                "all": purge_all,
                "before": payload.before,
                "deleted": deleted,
            })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(deleted)))
}
