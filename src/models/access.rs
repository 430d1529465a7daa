//! Module access models
//!
//! `AccessRow` is the persisted override layer. `ResolvedPermission` and
//! `PermissionTable` are the in-memory view produced by merging overrides over
//! the fallback derived from the navigation tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::{Role, ADMIN_ROLE};

/// A persisted override for one `(module, role)` cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRow {
    pub module_id: String,
    pub role_id: Uuid,
    pub has_access: bool,
}

impl AccessRow {
    pub fn new(module_id: impl Into<String>, role_id: Uuid, has_access: bool) -> Self {
        Self {
            module_id: module_id.into(),
            role_id,
            has_access,
        }
    }
}

/// Resolved access for one module across every known role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPermission {
    pub module_id: String,
    pub label: String,
    pub parent_id: Option<String>,
    /// Role name -> access
    pub role_access: BTreeMap<String, bool>,
}

impl ResolvedPermission {
    /// Entry for a module that only exists in the access store
    ///
    /// Seeded with admin granted and every other known role denied.
    pub fn orphan(module_id: impl Into<String>, roles: &[Role]) -> Self {
        let module_id = module_id.into();
        let role_access = roles
            .iter()
            .map(|role| (role.name.clone(), role.is_admin()))
            .chain(std::iter::once((ADMIN_ROLE.to_string(), true)))
            .collect();

        Self {
            label: module_id.clone(),
            module_id,
            parent_id: None,
            role_access,
        }
    }

    /// Access for a role name; absent roles are denied
    pub fn allows(&self, role: &str) -> bool {
        self.role_access.get(role).copied().unwrap_or(false)
    }
}

/// Flat `module id -> ResolvedPermission` map
///
/// Ordered by module id so serialized output and iteration are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTable(BTreeMap<String, ResolvedPermission>);

impl PermissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module_id: &str) -> Option<&ResolvedPermission> {
        self.0.get(module_id)
    }

    pub fn get_mut(&mut self, module_id: &str) -> Option<&mut ResolvedPermission> {
        self.0.get_mut(module_id)
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.0.contains_key(module_id)
    }

    pub fn insert(&mut self, permission: ResolvedPermission) {
        self.0.insert(permission.module_id.clone(), permission);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedPermission> {
        self.0.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResolvedPermission> {
        self.0.values_mut()
    }

    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Resolved access for a cell, `None` when the module is unknown
    pub fn access(&self, module_id: &str, role: &str) -> Option<bool> {
        self.get(module_id).map(|p| p.allows(role))
    }
}

impl FromIterator<ResolvedPermission> for PermissionTable {
    fn from_iter<I: IntoIterator<Item = ResolvedPermission>>(iter: I) -> Self {
        let mut table = PermissionTable::new();
        for permission in iter {
            table.insert(permission);
        }
        table
    }
}

/// Counters describing one merge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Rows written into the table
    pub applied: usize,
    /// Rows whose role id no longer exists
    pub stale: usize,
    /// Modules created from rows that the navigation tree does not know
    pub orphaned: usize,
    /// Rows for the admin role or the logout module, whose access is fixed
    pub ignored: usize,
}

/// Where the currently served table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadSource {
    /// Fallback merged with store overrides
    Merged,
    /// Store could not be read; fallback only
    FallbackOnly,
}

/// Result of applying a cascading edit to a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Copy of the input table with the edit applied
    pub table: PermissionTable,
    /// Edited module first, then its descendants in depth-first order
    pub changed_module_ids: Vec<String>,
    pub role: String,
    pub has_access: bool,
}

/// Request to change one cell of the permission matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEditRequest {
    pub module_id: String,
    pub role: String,
    pub has_access: bool,
}

/// Permission matrix as served to the admin UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionMatrix {
    pub roles: Vec<Role>,
    pub modules: Vec<ResolvedPermission>,
    pub source: ReloadSource,
}

/// Outcome of a committed edit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEditResponse {
    pub changed_module_ids: Vec<String>,
    pub matrix: PermissionMatrix,
}
