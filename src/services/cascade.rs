//! Cascading permission edits
//!
//! Setting access for a module applies the same value to every descendant, so a
//! revoked section cannot leave reachable children behind.

use std::collections::{BTreeMap, HashSet};

use crate::models::{AccessRow, CascadeOutcome, PermissionTable, Role, RoleKey};
use crate::utils::{AccessError, AccessResult};

/// Applies a single `(module, role, value)` edit to a module subtree
#[derive(Debug, Clone)]
pub struct CascadeEditor {
    logout_module_id: String,
}

impl CascadeEditor {
    pub fn new(logout_module_id: impl Into<String>) -> Self {
        Self {
            logout_module_id: logout_module_id.into(),
        }
    }

    /// Apply the edit to a copy of `table`
    ///
    /// Children are visited in module id order, so the changed id list is
    /// deterministic for a given table.
    pub fn apply(
        &self,
        table: &PermissionTable,
        module_id: &str,
        role: &RoleKey,
        has_access: bool,
    ) -> AccessResult<CascadeOutcome> {
        let role_name = match role {
            RoleKey::Admin => {
                return Err(AccessError::InvariantViolation(
                    "access for the admin role cannot be changed".to_string(),
                ))
            }
            RoleKey::Unauthenticated => {
                return Err(AccessError::InvariantViolation(
                    "access for unauthenticated requests cannot be changed".to_string(),
                ))
            }
            RoleKey::Named(name) => name.as_str(),
        };

        if module_id == self.logout_module_id {
            return Err(AccessError::InvariantViolation(format!(
                "module '{}' is always available to signed-in roles",
                module_id
            )));
        }

        let target = table
            .get(module_id)
            .ok_or_else(|| AccessError::NotFound(format!("module '{}'", module_id)))?;
        if !target.role_access.contains_key(role_name) {
            return Err(AccessError::NotFound(format!("role '{}'", role_name)));
        }

        let changed_module_ids = subtree(table, module_id);

        let mut edited = table.clone();
        for id in &changed_module_ids {
            if let Some(entry) = edited.get_mut(id) {
                entry.role_access.insert(role_name.to_string(), has_access);
            }
        }

        Ok(CascadeOutcome {
            table: edited,
            changed_module_ids,
            role: role_name.to_string(),
            has_access,
        })
    }

    /// Rows to persist for an outcome: every changed module for the edited role
    pub fn rows_for(outcome: &CascadeOutcome, roles: &[Role]) -> AccessResult<Vec<AccessRow>> {
        let role = roles
            .iter()
            .find(|r| r.name == outcome.role)
            .ok_or_else(|| AccessError::NotFound(format!("role '{}'", outcome.role)))?;

        Ok(outcome
            .changed_module_ids
            .iter()
            .map(|id| AccessRow::new(id.clone(), role.id, outcome.has_access))
            .collect())
    }
}

/// `root` followed by its descendants in depth-first pre-order
fn subtree(table: &PermissionTable, root: &str) -> Vec<String> {
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for entry in table.iter() {
        if let Some(parent) = entry.parent_id.as_deref() {
            children.entry(parent).or_default().push(&entry.module_id);
        }
    }

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        order.push(id.to_string());
        if let Some(kids) = children.get(id) {
            // Reverse so the first child is popped first
            stack.extend(kids.iter().rev().copied());
        }
    }
    order
}
