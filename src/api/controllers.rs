use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;

use super::requester::{client_ip, require_admin, require_user};
use super::validation::validate_pairing_code;
use super::{
    ApiError, ApiResponse, AppState, ClaimRequest, ClaimResultDto, ControllerDto,
    CreateControllerRequest,
};

pub async fn list_controllers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<ControllerDto>>>, ApiError> {
    require_admin(&state, &headers).await?;

    let controllers = state.store.list_controllers().await?;
    let dtos = controllers.into_iter().map(ControllerDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

/// Registers a device and issues its pairing code.
pub async fn create_controller(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateControllerRequest>,
) -> Result<Json<ApiResponse<ControllerDto>>, ApiError> {
    let actor = require_admin(&state, &headers).await?;

    let device_id = payload.device_id.trim();
    if device_id.is_empty() {
        return Err(ApiError::validation("device_id cannot be empty"));
    }

    let pairing_code = state.pairing.generate_code().await?;

    let controller = state
        .store
        .create_controller(device_id, payload.label.as_deref(), &pairing_code)
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Device ID already registered"))?;

    state
        .audit
        .record(
            Some(actor.id),
            "controller.create",
            "controller",
            Some(&controller.id.to_string()),
            Some(serde_json::json!({ "device_id": device_id })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(ControllerDto::from(controller))))
}

pub async fn delete_controller(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let actor = require_admin(&state, &headers).await?;

    let controller = state
        .store
        .get_controller(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Controller", id))?;

    state.store.delete_controller(id).await?;

    state
        .audit
        .record(
            Some(actor.id),
            "controller.delete",
            "controller",
            Some(&id.to_string()),
            Some(serde_json::json!({ "device_id": controller.device_id })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(())))
}

/// Redeems a pairing code for ownership of the matching controller.
pub async fn claim_controller(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ClaimRequest>,
) -> Result<Json<ApiResponse<ClaimResultDto>>, ApiError> {
    let actor = require_user(&state, &headers).await?;

    // Format is checked before the protocol runs so malformed input
    // never reaches the store.
    let code = validate_pairing_code(payload.code.trim())?;

    let (controller, assignment) = state
        .pairing
        .claim(actor.id, code, payload.label.as_deref())
        .await?;

    state
        .audit
        .record(
            Some(actor.id),
            "controller.claim",
            "controller",
            Some(&controller.id.to_string()),
            Some(serde_json::json!({ "device_id": controller.device_id })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(ClaimResultDto {
        controller: ControllerDto::from(controller),
        assignment_id: assignment.id,
        label: assignment.label,
    })))
}
