use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::requester::require_dev;
use super::{ApiError, ApiResponse, AppState, HealthDto};

pub async fn get_health(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<HealthDto>>, ApiError> {
    require_dev(&state, &headers).await?;

    let database = match state.store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => {
            tracing::error!("Health check DB ping failed: {:#}", e);
            "unreachable".to_string()
        }
    };

    let users = state.store.list_users().await?.len() as u64;
    let controllers = state.store.controller_count().await?;
    let readings = state.store.reading_count().await?;
    let audit_entries = state.store.audit_count().await?;

    Ok(Json(ApiResponse::success(HealthDto {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        database,
        users,
        controllers,
        readings,
        audit_entries,
    })))
}
