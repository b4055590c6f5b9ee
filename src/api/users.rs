use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::sync::Arc;

use super::requester::{client_ip, require_admin, require_dev, require_user};
use super::validation::{validate_email, validate_password, validate_username};
use super::{
    ApiError, ApiResponse, AppState, AssignControllerRequest, AssignmentDto, InviteUserRequest,
    RelabelRequest, UpdateUserRequest, UserDto,
};
use crate::db::NewUser;
use crate::models::Role;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    require_admin(&state, &headers).await?;

    let users = state.store.list_users().await?;
    let dtos = users.into_iter().map(UserDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    require_admin(&state, &headers).await?;

    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// Invite a new account. Admins may invite plain users; handing out
/// admin or dev roles takes a dev inviter.
pub async fn invite_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<InviteUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let actor = require_admin(&state, &headers).await?;

    let role = payload.role.unwrap_or(Role::User);
    if role >= Role::Admin && !actor.is_dev() {
        return Err(ApiError::forbidden(
            "Only a dev account can invite admin or dev users",
        ));
    }

    let username = validate_username(&payload.username)?;
    let email = validate_email(&payload.email)?;
    let password = validate_password(&payload.password)?;

    let user = state
        .store
        .create_user(
            NewUser {
                username,
                email,
                password,
                role,
                invited_by: Some(actor.id),
                must_change_password: true,
            },
            &state.config.security,
        )
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Email already registered"))?;

    state
        .audit
        .record(
            Some(actor.id),
            "user.invite",
            "user",
            Some(&user.id.to_string()),
            Some(serde_json::json!({ "role": role.as_str() })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// Role and flag mutation is dev-exclusive; an admin is rejected even
/// when the requested role equals the current one.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let actor = require_dev(&state, &headers).await?;

    if payload.role.is_none() && payload.must_change_password.is_none() {
        return Err(ApiError::validation(
            "At least one of role or must_change_password is required",
        ));
    }

    let mut user = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    if let Some(role) = payload.role {
        user = state
            .store
            .set_user_role(id, role)
            .await?
            .ok_or_else(|| ApiError::not_found("User", id))?;
    }
    if let Some(flag) = payload.must_change_password {
        user = state
            .store
            .set_user_must_change_password(id, flag)
            .await?
            .ok_or_else(|| ApiError::not_found("User", id))?;
    }

    state
        .audit
        .record(
            Some(actor.id),
            "user.update",
            "user",
            Some(&id.to_string()),
            Some(serde_json::json!({
                "role": payload.role.map(|r| r.as_str()),
                "must_change_password": payload.must_change_password,
            })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let actor = require_dev(&state, &headers).await?;

    // Self-deletion goes through the account route, never this one.
    if actor.id == id {
        return Err(ApiError::validation(
            "Cannot delete your own account via the user administration route",
        ));
    }

    let target = state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    // Holds trivially behind require_dev; kept explicit so the
    // invariant survives future policy edits.
    if target.is_dev() && !actor.is_dev() {
        return Err(ApiError::forbidden("Only a dev account can delete a dev user"));
    }

    state.store.delete_user(id).await?;

    state
        .audit
        .record(
            Some(actor.id),
            "user.delete",
            "user",
            Some(&id.to_string()),
            Some(serde_json::json!({ "username": target.username })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(())))
}

// ---- Controller assignments ----

async fn require_self_or_admin(
    state: &AppState,
    headers: &HeaderMap,
    target_id: i32,
) -> Result<crate::models::User, ApiError> {
    let actor = require_user(state, headers).await?;
    if actor.id != target_id && !actor.is_admin() {
        return Err(ApiError::forbidden(
            "Can only manage your own controllers",
        ));
    }
    Ok(actor)
}

pub async fn list_user_controllers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<AssignmentDto>>>, ApiError> {
    require_self_or_admin(&state, &headers, id).await?;

    let assignments = state.store.list_user_controllers(id).await?;
    let dtos = assignments.into_iter().map(AssignmentDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

/// Direct assignment without a pairing code; admin provisioning path.
pub async fn assign_controller(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<AssignControllerRequest>,
) -> Result<Json<ApiResponse<Vec<AssignmentDto>>>, ApiError> {
    let actor = require_admin(&state, &headers).await?;

    state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;
    state
        .store
        .get_controller(payload.controller_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Controller", payload.controller_id))?;

    state
        .store
        .assign_controller(id, payload.controller_id, payload.label.as_deref())
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Controller already assigned to this user"))?;

    state
        .audit
        .record(
            Some(actor.id),
            "assignment.create",
            "user_controller",
            Some(&format!("{}:{}", id, payload.controller_id)),
            None,
            client_ip(&headers).as_deref(),
        )
        .await;

    let assignments = state.store.list_user_controllers(id).await?;
    let dtos = assignments.into_iter().map(AssignmentDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn relabel_controller(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, controller_id)): Path<(i32, i32)>,
    Json(payload): Json<RelabelRequest>,
) -> Result<Json<ApiResponse<Vec<AssignmentDto>>>, ApiError> {
    require_self_or_admin(&state, &headers, id).await?;

    state
        .store
        .relabel_assignment(id, controller_id, payload.label.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment for controller", controller_id))?;

    let assignments = state.store.list_user_controllers(id).await?;
    let dtos = assignments.into_iter().map(AssignmentDto::from).collect();

    Ok(Json(ApiResponse::success(dtos)))
}

pub async fn unassign_controller(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, controller_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let actor = require_self_or_admin(&state, &headers, id).await?;

    let removed = state.store.unassign_controller(id, controller_id).await?;
    if !removed {
        return Err(ApiError::not_found("Assignment for controller", controller_id));
    }

    state
        .audit
        .record(
            Some(actor.id),
            "assignment.delete",
            "user_controller",
            Some(&format!("{}:{}", id, controller_id)),
            None,
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(())))
}
