//! In-memory stores
//!
//! Backed by `tokio::sync::RwLock` maps. Nothing survives a restart; these exist
//! for tests and for running the engine without a database. The access store
//! can be told to fail or stall reads and writes so callers can exercise their
//! error and timeout paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ensure_rows_in_scope, AccessStore, RoleStore};
use crate::models::{AccessRow, Role, SystemRole};

#[derive(Debug, Default)]
pub struct MemoryAccessStore {
    rows: RwLock<BTreeMap<(String, Uuid), bool>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    read_delay_ms: AtomicU64,
    write_delay_ms: AtomicU64,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: impl IntoIterator<Item = AccessRow>) -> Self {
        let map = rows
            .into_iter()
            .map(|r| ((r.module_id, r.role_id), r.has_access))
            .collect();
        Self {
            rows: RwLock::new(map),
            ..Default::default()
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold every read for `delay` before answering
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Hold every write for `delay` before applying it
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

async fn stall(delay_ms: &AtomicU64) {
    let ms = delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn read_all(&self) -> Result<Vec<AccessRow>> {
        stall(&self.read_delay_ms).await;
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("access store unavailable");
        }
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .map(|((module_id, role_id), has_access)| {
                AccessRow::new(module_id.clone(), *role_id, *has_access)
            })
            .collect())
    }

    async fn replace_rows_for_modules(
        &self,
        module_ids: &[String],
        rows: &[AccessRow],
    ) -> Result<()> {
        stall(&self.write_delay_ms).await;
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("access store rejected write");
        }
        ensure_rows_in_scope(module_ids, rows)?;

        let mut stored = self.rows.write().await;
        for row in rows {
            stored.insert((row.module_id.clone(), row.role_id), row.has_access);
        }
        Ok(())
    }
}

/// Role store seeded with the system roles
#[derive(Debug)]
pub struct MemoryRoleStore {
    roles: RwLock<BTreeMap<Uuid, Role>>,
    fail_reads: AtomicBool,
}

impl Default for MemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::with_roles(SystemRole::all().iter().map(SystemRole::to_role))
    }

    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: RwLock::new(roles.into_iter().map(|r| (r.id, r)).collect()),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn list(&self) -> Result<Vec<Role>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("role store unavailable");
        }
        let mut roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|a, b| b.is_system.cmp(&a.is_system).then_with(|| a.name.cmp(&b.name)));
        Ok(roles)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Role>> {
        Ok(self.roles.read().await.get(id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|r| r.name == name)
            .cloned())
    }

    async fn insert(&self, role: &Role) -> Result<()> {
        let mut roles = self.roles.write().await;
        if roles.values().any(|r| r.name == role.name) {
            anyhow::bail!("UNIQUE constraint failed: roles.name");
        }
        roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn update(&self, role: &Role) -> Result<bool> {
        let mut roles = self.roles.write().await;
        match roles.get_mut(&role.id) {
            Some(existing) => {
                existing.display_name = role.display_name.clone();
                existing.description = role.description.clone();
                existing.updated_at = role.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        Ok(self.roles.write().await.remove(id).is_some())
    }
}
