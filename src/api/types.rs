use serde::{Deserialize, Serialize};

use crate::db::AssignmentDetail;
use crate::entities::controllers;
use crate::models::{Role, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// User as serialized to clients. The boolean flags are projections of
/// the role, recomputed here; they are never independent state.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_admin: bool,
    pub is_dev: bool,
    pub must_change_password: bool,
    pub invited_by: Option<i32>,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            is_admin: user.is_admin(),
            is_dev: user.is_dev(),
            must_change_password: user.must_change_password,
            invited_by: user.invited_by,
            created_at: user.created_at,
        }
    }
}

/// Admin-facing controller view; includes the pairing code so it can be
/// re-displayed to whoever provisions devices.
#[derive(Debug, Serialize)]
pub struct ControllerDto {
    pub id: i32,
    pub device_id: String,
    pub label: Option<String>,
    pub pairing_code: Option<String>,
    pub created_at: String,
}

impl From<controllers::Model> for ControllerDto {
    fn from(model: controllers::Model) -> Self {
        Self {
            id: model.id,
            device_id: model.device_id,
            label: model.label,
            pairing_code: model.pairing_code,
            created_at: model.created_at,
        }
    }
}

/// A user's ownership of one controller. The per-assignment label wins
/// over the controller's own label when both are set.
#[derive(Debug, Serialize)]
pub struct AssignmentDto {
    pub id: i32,
    pub controller_id: i32,
    pub device_id: String,
    pub label: Option<String>,
    pub claimed_at: String,
}

impl From<AssignmentDetail> for AssignmentDto {
    fn from(detail: AssignmentDetail) -> Self {
        Self {
            id: detail.assignment.id,
            controller_id: detail.controller.id,
            device_id: detail.controller.device_id,
            label: detail.assignment.label.or(detail.controller.label),
            claimed_at: detail.assignment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimResultDto {
    pub controller: ControllerDto,
    pub assignment_id: i32,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaginationDto {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationDto {
    #[must_use]
    pub const fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReadingsPage {
    pub readings: Vec<crate::entities::readings::Model>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct AuditPage {
    pub entries: Vec<crate::entities::audit_log::Model>,
    pub pagination: PaginationDto,
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub database: String,
    pub users: u64,
    pub controllers: u64,
    pub readings: u64,
    pub audit_entries: u64,
}

// ---- Request payloads ----

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub must_change_password: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateControllerRequest {
    pub device_id: String,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub code: String,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignControllerRequest {
    pub controller_id: i32,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RelabelRequest {
    pub label: Option<String>,
}

/// Exactly one of `all: true` or `before` must be supplied.
#[derive(Debug, Deserialize)]
pub struct PurgeAuditRequest {
    #[serde(default)]
    pub all: Option<bool>,
    #[serde(default)]
    pub before: Option<String>,
}
