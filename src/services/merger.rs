//! Overlay persisted access rows onto the fallback table

use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{AccessRow, MergeReport, PermissionTable, ResolvedPermission, Role, ADMIN_ROLE};

/// Merges store overrides over a fallback table for a fixed role list
pub struct PermissionMerger<'a> {
    roles: &'a [Role],
    by_id: HashMap<Uuid, &'a Role>,
    logout_module_id: &'a str,
}

impl<'a> PermissionMerger<'a> {
    pub fn new(roles: &'a [Role], logout_module_id: &'a str) -> Self {
        Self {
            roles,
            by_id: roles.iter().map(|r| (r.id, r)).collect(),
            logout_module_id,
        }
    }

    /// Returns a new table; `fallback` is not modified
    ///
    /// - rows for unknown role ids are skipped
    /// - rows for modules outside the tree create an orphan entry
    /// - admin cells stay granted whatever the rows say
    pub fn merge(
        &self,
        fallback: &PermissionTable,
        rows: &[AccessRow],
    ) -> (PermissionTable, MergeReport) {
        let mut table = fallback.clone();
        let mut report = MergeReport::default();

        for row in rows {
            if row.module_id == self.logout_module_id {
                report.ignored += 1;
                continue;
            }

            let Some(role) = self.by_id.get(&row.role_id) else {
                warn!(
                    module_id = %row.module_id,
                    role_id = %row.role_id,
                    "Skipping access row for unknown role"
                );
                report.stale += 1;
                continue;
            };

            if role.is_admin() {
                report.ignored += 1;
                continue;
            }

            if !table.contains(&row.module_id) {
                debug!(module_id = %row.module_id, "Module only exists in access store");
                table.insert(ResolvedPermission::orphan(row.module_id.clone(), self.roles));
                report.orphaned += 1;
            }

            if let Some(entry) = table.get_mut(&row.module_id) {
                entry.role_access.insert(role.name.clone(), row.has_access);
                report.applied += 1;
            }
        }

        for entry in table.iter_mut() {
            entry.role_access.insert(ADMIN_ROLE.to_string(), true);
        }

        (table, report)
    }
}
