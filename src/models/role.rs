//! Role models and role identity types

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::{validation::validate_role_slug, AccessError};

/// Name of the built-in administrator role
pub const ADMIN_ROLE: &str = "admin";

/// Reserved name of the pseudo-role held by requests without a session
pub const UNAUTHENTICATED_ROLE: &str = "unauthenticated";

/// A role that can be granted access to modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier
    pub id: Uuid,

    /// Role slug (e.g., "admin", "billing-team")
    pub name: String,

    /// Human-readable display name
    pub display_name: String,

    /// Description of the role
    pub description: Option<String>,

    /// Whether this is a built-in system role
    pub is_system: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for Role {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            display_name: String::new(),
            description: None,
            is_system: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl Role {
    /// Whether this is the administrator role
    pub fn is_admin(&self) -> bool {
        self.name == ADMIN_ROLE
    }
}

/// Request to create a new role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to update an existing role
///
/// The slug is stable once created; only display fields change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Validated role slug for custom roles
///
/// Never holds `admin` or `unauthenticated`; those are represented by
/// [`RoleKey::Admin`] and [`RoleKey::Unauthenticated`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(name: &str) -> Result<Self, AccessError> {
        if name == ADMIN_ROLE || name == UNAUTHENTICATED_ROLE {
            return Err(AccessError::Validation(format!(
                "'{}' is a reserved role name",
                name
            )));
        }
        if !validate_role_slug(name) {
            return Err(AccessError::Validation(format!(
                "Invalid role name '{}': expected lowercase letters, digits and single hyphens",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleName {
    type Error = AccessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RoleName::parse(&value)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role a caller acts under when asking for module access
///
/// The two invariant-bearing roles are closed variants; every other role is
/// an open, validated slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoleKey {
    Admin,
    Unauthenticated,
    Named(RoleName),
}

impl RoleKey {
    /// Role carried by a request, if any. Missing or blank means no session.
    pub fn from_session(role: Option<&str>) -> Result<Self, AccessError> {
        match role.map(str::trim) {
            None | Some("") => Ok(RoleKey::Unauthenticated),
            Some(value) => value.parse(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RoleKey::Admin => ADMIN_ROLE,
            RoleKey::Unauthenticated => UNAUTHENTICATED_ROLE,
            RoleKey::Named(name) => name.as_str(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, RoleKey::Unauthenticated)
    }
}

impl FromStr for RoleKey {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ADMIN_ROLE => Ok(RoleKey::Admin),
            UNAUTHENTICATED_ROLE => Ok(RoleKey::Unauthenticated),
            other => RoleName::parse(other).map(RoleKey::Named),
        }
    }
}

impl TryFrom<String> for RoleKey {
    type Error = AccessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoleKey> for String {
    fn from(key: RoleKey) -> Self {
        key.as_str().to_string()
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in system roles, seeded by the initial migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemRole {
    Admin,
    User,
}

impl SystemRole {
    /// Get the role name
    pub fn name(&self) -> &'static str {
        match self {
            SystemRole::Admin => ADMIN_ROLE,
            SystemRole::User => "user",
        }
    }

    /// Get the display name
    pub fn display_name(&self) -> &'static str {
        match self {
            SystemRole::Admin => "Administrator",
            SystemRole::User => "User",
        }
    }

    /// Get the description
    pub fn description(&self) -> &'static str {
        match self {
            SystemRole::Admin => "Full access to every module",
            SystemRole::User => "Default role for signed-in members",
        }
    }

    /// Get all system roles
    pub fn all() -> Vec<SystemRole> {
        vec![SystemRole::Admin, SystemRole::User]
    }

    /// Get the fixed UUID for this system role
    pub fn uuid(&self) -> Uuid {
        match self {
            SystemRole::Admin => Uuid::from_u128(1),
            SystemRole::User => Uuid::from_u128(2),
        }
    }

    /// Create the Role struct for this system role
    pub fn to_role(&self) -> Role {
        Role {
            id: self.uuid(),
            name: self.name().to_string(),
            display_name: self.display_name().to_string(),
            description: Some(self.description().to_string()),
            is_system: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
