use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;

use super::requester::require_user;
use super::validation::{
    validate_history_hours, validate_limit, validate_page, validate_sort_column,
    validate_sort_order,
};
use super::{ApiError, ApiResponse, AppState, PaginationDto, ReadingsPage};
use crate::db::{DeviceScope, ReadingsQuery};
use crate::entities::readings;
use crate::models::User;
use crate::parser::parse_search;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingsParams {
    pub search: Option<String>,
    pub device: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub hours: Option<i64>,
}

async fn scope_for(state: &AppState, user: &User) -> Result<DeviceScope, ApiError> {
    if user.is_admin() {
        Ok(DeviceScope::All)
    } else {
        let owned = state.store.owned_device_ids(user.id).await?;
        Ok(DeviceScope::Owned(owned))
    }
}

/// Enforces that a non-privileged caller owns `device_id`. Forbidden is
/// deliberate here: an empty result would hide the denial.
async fn ensure_device_access(
    state: &AppState,
    user: &User,
    device_id: &str,
) -> Result<(), ApiError> {
    if user.is_admin() {
        return Ok(());
    }
    if state.store.owns_device(user.id, device_id).await? {
        return Ok(());
    }
    Err(ApiError::forbidden("You do not own this device"))
}

pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    let scope = scope_for(&state, &user).await?;

    let devices = state.store.distinct_devices(&scope).await?;
    Ok(Json(ApiResponse::success(devices)))
}

pub async fn latest_reading(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(device_id): Path<String>,
) -> Result<Json<ApiResponse<readings::Model>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    ensure_device_access(&state, &user, &device_id).await?;

    let reading = state
        .store
        .latest_reading(&device_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Readings for device", &device_id))?;

    Ok(Json(ApiResponse::success(reading)))
}

pub async fn reading_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(device_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<Vec<readings::Model>>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    ensure_device_access(&state, &user, &device_id).await?;

    let hours = validate_history_hours(params.hours)?;
    let readings = state.store.reading_history(&device_id, hours).await?;

    Ok(Json(ApiResponse::success(readings)))
}

/// Filtered, sorted, paginated readings listing with the search grammar.
pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ReadingsParams>,
) -> Result<Json<ApiResponse<ReadingsPage>>, ApiError> {
    let user = require_user(&state, &headers).await?;

    let sort_by = validate_sort_column(params.sort_by.as_deref())?;
    let ascending = validate_sort_order(params.sort_order.as_deref())?;
    let page = validate_page(params.page)?;
    let limit = validate_limit(params.limit)?;

    // An explicit device filter outside the caller's ownership is a
    // denial, not an empty page.
    if let Some(device) = &params.device {
        ensure_device_access(&state, &user, device).await?;
    }

    let scope = scope_for(&state, &user).await?;
    let filter = params.search.as_deref().and_then(parse_search);

    let query = ReadingsQuery {
        scope,
        filter,
        device: params.device.clone(),
        sort_by,
        ascending,
        page,
        limit,
    };

    let (readings, total) = state.store.query_readings(&query).await?;

    Ok(Json(ApiResponse::success(ReadingsPage {
        readings,
        pagination: PaginationDto::new(page, limit, total),
    })))
}
