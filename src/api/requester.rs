//! Per-request identity resolution.
//!
//! Identity arrives out-of-band as an `x-user-id` header set by the
//! fronting proxy. An absent or unparsable header resolves to no
//! requester without touching the store; guards then decide whether
//! that is acceptable for the route.

use axum::http::HeaderMap;

use super::{ApiError, AppState};
use crate::models::User;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolves the caller, or `None` when no usable identity was asserted.
pub async fn get_requester(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<User>, ApiError> {
    let Some(raw) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let Some(user_id) = raw
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
    else {
        return Ok(None);
    };

    let user = state.store.get_user(user_id).await?;
    Ok(user)
}

pub async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    get_requester(state, headers)
        .await?
        .ok_or_else(ApiError::unauthorized)
}

pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let user = require_user(state, headers).await?;
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin access required"));
    }
    Ok(user)
}

pub async fn require_dev(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let user = require_user(state, headers).await?;
    if !user.is_dev() {
        return Err(ApiError::forbidden("Dev access required"));
    }
    Ok(user)
}

/// Client address for audit entries: first hop of `x-forwarded-for`
/// when the proxy supplies one.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}
