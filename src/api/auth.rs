use axum::{Json, extract::State, http::HeaderMap};
use std::sync::Arc;

use super::requester::{client_ip, require_user};
use super::validation::{validate_email, validate_password, validate_username};
use super::{
    ApiError, ApiResponse, AppState, ChangePasswordRequest, LoginRequest, RegisterRequest,
    UpdateProfileRequest, UserDto,
};
use crate::db::{NewUser, repositories::user::verify_password_hash};
use crate::models::Role;

/// Self-registration always yields a plain user; stronger roles only
/// come out of the invite path.
pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
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
                role: Role::User,
                invited_by: None,
                must_change_password: false,
            },
            &state.config.security,
        )
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Email already registered"))?;

    state
        .audit
        .record(
            Some(user.id),
            "user.register",
            "user",
            Some(&user.id.to_string()),
            None,
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// Email + password login. An unknown email and a wrong password are
/// indistinguishable to the caller.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let Some((user, password_hash)) = state
        .store
        .get_user_by_email_with_password(payload.email.trim())
        .await?
    else {
        return Err(invalid());
    };

    if !verify_password_hash(&password_hash, &payload.password).await? {
        return Err(invalid());
    }

    state
        .audit
        .record(
            Some(user.id),
            "user.login",
            "user",
            Some(&user.id.to_string()),
            None,
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = require_user(&state, &headers).await?;

    if payload.username.is_none() && payload.email.is_none() {
        return Err(ApiError::validation(
            "At least one of username or email is required",
        ));
    }

    let username = payload
        .username
        .as_deref()
        .map(validate_username)
        .transpose()?;
    let email = payload.email.as_deref().map(validate_email).transpose()?;

    let updated = state
        .store
        .update_user_profile(user.id, username, email)
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Email already registered"))?
        .ok_or_else(|| ApiError::not_found("User", user.id))?;

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

/// Requires the current password; a successful change clears the
/// forced-rotation flag.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = require_user(&state, &headers).await?;
    validate_password(&payload.new_password)?;

    if !state
        .store
        .verify_user_password(user.id, &payload.current_password)
        .await?
    {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    state
        .store
        .update_user_password(user.id, &payload.new_password, &state.config.security)
        .await?;

    let updated = state
        .store
        .get_user(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", user.id))?;

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

pub async fn delete_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let user = require_user(&state, &headers).await?;

    state.store.delete_user(user.id).await?;

    state
        .audit
        .record(
            Some(user.id),
            "user.delete",
            "user",
            Some(&user.id.to_string()),
            Some(serde_json::json!({ "self": true })),
            client_ip(&headers).as_deref(),
        )
        .await;

    Ok(Json(ApiResponse::success(())))
}
