//! Database layer
//!
//! Persistence for the two pieces of mutable state the engine owns:
//! - Roles (`roles` table)
//! - Per-module access overrides (`module_access` table)
//!
//! Services talk to the storage through the [`AccessStore`] and [`RoleStore`]
//! traits so tests can swap in the in-memory stores from [`memory`].

pub mod access_repository;
pub mod memory;
pub mod role_repository;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{AccessRow, Role};

pub use access_repository::SqliteAccessStore;
pub use memory::{MemoryAccessStore, MemoryRoleStore};
pub use role_repository::SqliteRoleStore;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .with_context(|| format!("Failed to connect to database: {}", config.url))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Check that the database answers queries
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Persisted `(module, role) -> has_access` overrides
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Every persisted override row
    async fn read_all(&self) -> Result<Vec<AccessRow>>;

    /// Atomically write `rows`, all of which must belong to `module_ids`
    ///
    /// Each row overwrites its `(module_id, role_id)` cell; cells not named in
    /// `rows` keep their current value. Either every row is written or none.
    async fn replace_rows_for_modules(&self, module_ids: &[String], rows: &[AccessRow])
        -> Result<()>;
}

/// Role records
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// System roles first, then by name
    async fn list(&self) -> Result<Vec<Role>>;
    async fn get(&self, id: &Uuid) -> Result<Option<Role>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Role>>;
    async fn insert(&self, role: &Role) -> Result<()>;
    /// Returns false when no row matched
    async fn update(&self, role: &Role) -> Result<bool>;
    /// Returns false when no row matched
    async fn delete(&self, id: &Uuid) -> Result<bool>;
}

/// Reject rows that fall outside the declared module set
pub(crate) fn ensure_rows_in_scope(module_ids: &[String], rows: &[AccessRow]) -> Result<()> {
    if let Some(row) = rows.iter().find(|r| !module_ids.contains(&r.module_id)) {
        anyhow::bail!(
            "Access row for module '{}' is outside the replaced module set",
            row.module_id
        );
    }
    Ok(())
}
