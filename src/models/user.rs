use serde::{Deserialize, Serialize};

use crate::entities::users;

/// Three-tier role hierarchy. `Dev` carries every `Admin` privilege and
/// `Admin` every `User` privilege, so ordering comparisons express
/// "at least this role".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Dev,
}

impl Role {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "dev" => Some(Self::Dev),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Dev => "dev",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized user record. The role enum is the only role
/// representation held in memory; the legacy boolean columns are folded
/// in at load time and projected back out at the serialization boundary.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub must_change_password: bool,
    pub invited_by: Option<i32>,
    pub created_at: String,
}

impl User {
    /// True for admin and dev roles alike.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role >= Role::Admin
    }

    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.role == Role::Dev
    }
}

/// Effective role from the stored role column plus the legacy flags.
/// Either representation may have been set directly by a migration or
/// an old API call; the strongest claim wins.
#[must_use]
pub fn normalize_role(role: &str, is_admin: bool, is_dev: bool) -> Role {
    let mut effective = Role::parse(role).unwrap_or(Role::User);
    if is_admin && effective < Role::Admin {
        effective = Role::Admin;
    }
    if is_dev {
        effective = Role::Dev;
    }
    effective
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        let role = normalize_role(&model.role, model.is_admin, model.is_dev);
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            role,
            must_change_password: model.must_change_password,
            invited_by: model.invited_by,
            created_at: model.created_at,
        }
    }
}
