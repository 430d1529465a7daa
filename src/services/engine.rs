//! Access engine service
//!
//! `AccessService` owns the published permission snapshot. Readers clone an
//! `Arc` of the current snapshot and never wait on I/O. Writers (reloads and
//! edits) are serialized by an async mutex, and a new snapshot is published
//! only after a successful merge from the store.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{AccessConfig, UnknownModulePolicy};
use crate::db::{AccessStore, RoleStore};
use crate::models::{
    AccessEditResponse, MergeReport, ModuleTree, PermissionMatrix, PermissionTable, ReloadSource,
    Role, RoleKey, SystemRole,
};
use crate::services::{CascadeEditor, FallbackResolver, PermissionMerger};
use crate::utils::{AccessError, AccessResult};

/// What readers see
#[derive(Debug)]
struct Snapshot {
    roles: Vec<Role>,
    table: PermissionTable,
    source: ReloadSource,
}

/// Shared access engine
pub struct AccessService {
    resolver: FallbackResolver,
    editor: CascadeEditor,
    unknown_module: UnknownModulePolicy,
    store_timeout: Duration,
    access_store: Arc<dyn AccessStore>,
    role_store: Arc<dyn RoleStore>,
    snapshot: RwLock<Arc<Snapshot>>,
    write_lock: Mutex<()>,
}

impl AccessService {
    /// Build the service from a module tree
    ///
    /// The initial snapshot is the fallback for the system roles; call
    /// [`reload`](Self::reload) to pick up stored roles and overrides.
    pub fn new(
        tree: &ModuleTree,
        config: &AccessConfig,
        access_store: Arc<dyn AccessStore>,
        role_store: Arc<dyn RoleStore>,
    ) -> AccessResult<Self> {
        let resolver = FallbackResolver::new(tree, config.logout_module_id.clone())?;
        let roles: Vec<Role> = SystemRole::all().iter().map(SystemRole::to_role).collect();
        let table = resolver.resolve(&roles);

        info!(
            modules = resolver.module_count(),
            logout_module = %config.logout_module_id,
            "Access engine initialized from module tree"
        );

        Ok(Self {
            editor: CascadeEditor::new(config.logout_module_id.clone()),
            resolver,
            unknown_module: config.unknown_module,
            store_timeout: config.store_timeout(),
            access_store,
            role_store,
            snapshot: RwLock::new(Arc::new(Snapshot {
                roles,
                table,
                source: ReloadSource::FallbackOnly,
            })),
            write_lock: Mutex::new(()),
        })
    }

    fn current(&self) -> Arc<Snapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    async fn timed<T, F>(&self, fut: F) -> AccessResult<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result.map_err(AccessError::from),
            Err(_) => Err(AccessError::Timeout(self.store_timeout)),
        }
    }

    /// Re-read roles and overrides and publish a fresh table
    ///
    /// A failing role read keeps the current snapshot and returns the error. A
    /// failing override read publishes the fallback alone.
    pub async fn reload(&self) -> AccessResult<MergeReport> {
        let _guard = self.write_lock.lock().await;
        self.reload_locked().await
    }

    async fn reload_locked(&self) -> AccessResult<MergeReport> {
        let roles = self.timed(self.role_store.list()).await?;
        let fallback = self.resolver.resolve(&roles);

        let (table, report, source) = match self.timed(self.access_store.read_all()).await {
            Ok(rows) => {
                let (table, report) =
                    PermissionMerger::new(&roles, self.resolver.logout_module_id())
                        .merge(&fallback, &rows);
                (table, report, ReloadSource::Merged)
            }
            Err(e) => {
                warn!(error = %e, "Access store unreadable, serving fallback permissions");
                (fallback, MergeReport::default(), ReloadSource::FallbackOnly)
            }
        };
        self.publish_merged(roles, table, report, source);
        Ok(report)
    }

    fn publish_merged(
        &self,
        roles: Vec<Role>,
        table: PermissionTable,
        report: MergeReport,
        source: ReloadSource,
    ) {

        info!(
            roles = roles.len(),
            modules = table.len(),
            applied = report.applied,
            stale = report.stale,
            orphaned = report.orphaned,
            ignored = report.ignored,
            source = ?source,
            "Permission table reloaded"
        );

        self.publish(Snapshot {
            roles,
            table,
            source,
        });
    }

    /// Publish a committed edit when the full reload failed
    ///
    /// Roles come from the pre-edit snapshot. If the overrides cannot be read
    /// either, the edited candidate table is published as is.
    async fn publish_committed(&self, previous: &Snapshot, edited: PermissionTable) {
        let roles = previous.roles.clone();
        match self.timed(self.access_store.read_all()).await {
            Ok(rows) => {
                let fallback = self.resolver.resolve(&roles);
                let (table, report) =
                    PermissionMerger::new(&roles, self.resolver.logout_module_id())
                        .merge(&fallback, &rows);
                self.publish_merged(roles, table, report, ReloadSource::Merged);
            }
            Err(e) => {
                warn!(error = %e, "Access store unreadable after commit, publishing edited table");
                self.publish(Snapshot {
                    roles,
                    table: edited,
                    source: previous.source,
                });
            }
        }
    }

    /// Whether `role` may open `module_id`
    pub fn can_access(&self, module_id: &str, role: &RoleKey) -> bool {
        let role_name = match role {
            RoleKey::Admin => return true,
            RoleKey::Unauthenticated => return false,
            RoleKey::Named(name) => name.as_str(),
        };

        if module_id == self.resolver.logout_module_id() {
            return true;
        }

        let snapshot = self.current();
        if let Some(entry) = snapshot.table.get(module_id) {
            return entry.allows(role_name);
        }

        if let Some(entry) = self.resolver.resolve_module(module_id, &snapshot.roles) {
            return entry.allows(role_name);
        }

        debug!(
            module_id = %module_id,
            role = %role_name,
            policy = ?self.unknown_module,
            "Access check for unknown module"
        );
        self.unknown_module == UnknownModulePolicy::Allow
    }

    /// Apply a cascading edit and commit it to the store
    ///
    /// On a store failure the published table stays at its pre-edit state, a
    /// best-effort reload runs and the store error is returned. Once the store
    /// has committed the call succeeds and the published table reflects the
    /// edit, even when the role list cannot be re-read.
    pub async fn apply_and_persist(
        &self,
        module_id: &str,
        role: &RoleKey,
        has_access: bool,
    ) -> AccessResult<AccessEditResponse> {
        let _guard = self.write_lock.lock().await;
        let snapshot = self.current();

        let outcome = self
            .editor
            .apply(&snapshot.table, module_id, role, has_access)?;
        let rows = CascadeEditor::rows_for(&outcome, &snapshot.roles)?;

        let write = self.timed(
            self.access_store
                .replace_rows_for_modules(&outcome.changed_module_ids, &rows),
        );
        if let Err(e) = write.await {
            error!(
                module_id = %module_id,
                role = %role,
                error = %e,
                "Failed to persist access edit"
            );
            if let Err(reload_err) = self.reload_locked().await {
                warn!(error = %reload_err, "Reload after failed edit also failed");
            }
            return Err(e);
        }

        info!(
            module_id = %module_id,
            role = %role,
            has_access,
            changed = outcome.changed_module_ids.len(),
            "Access edit committed"
        );

        if let Err(e) = self.reload_locked().await {
            warn!(error = %e, "Reload after committed edit failed, re-merging with cached roles");
            self.publish_committed(&snapshot, outcome.table).await;
        }

        Ok(AccessEditResponse {
            changed_module_ids: outcome.changed_module_ids,
            matrix: self.matrix(),
        })
    }

    /// Current roles and resolved modules
    pub fn matrix(&self) -> PermissionMatrix {
        let snapshot = self.current();
        PermissionMatrix {
            roles: snapshot.roles.clone(),
            modules: snapshot.table.iter().cloned().collect(),
            source: snapshot.source,
        }
    }

    pub fn source(&self) -> ReloadSource {
        self.current().source
    }

    pub fn logout_module_id(&self) -> &str {
        self.resolver.logout_module_id()
    }
}
