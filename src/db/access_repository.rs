//! SQLite-backed access override store

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{ensure_rows_in_scope, AccessStore};
use crate::models::AccessRow;

/// Repository for the `module_access` table
#[derive(Clone)]
pub struct SqliteAccessStore {
    pool: SqlitePool,
}

impl SqliteAccessStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for SqliteAccessStore {
    async fn read_all(&self) -> Result<Vec<AccessRow>> {
        let rows = sqlx::query(
            "SELECT module_id, role_id, has_access FROM module_access ORDER BY module_id, role_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch module access rows")?;

        rows.iter().map(row_to_access).collect()
    }

    async fn replace_rows_for_modules(
        &self,
        module_ids: &[String],
        rows: &[AccessRow],
    ) -> Result<()> {
        ensure_rows_in_scope(module_ids, rows)?;
        if rows.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin access transaction")?;

        for row in rows {
            sqlx::query(
                "INSERT INTO module_access (module_id, role_id, has_access, updated_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(module_id, role_id)
                 DO UPDATE SET has_access = excluded.has_access, updated_at = excluded.updated_at",
            )
            .bind(&row.module_id)
            .bind(row.role_id.to_string())
            .bind(row.has_access)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to write access for module '{}'", row.module_id))?;
        }

        tx.commit()
            .await
            .context("Failed to commit access transaction")?;

        Ok(())
    }
}

fn row_to_access(row: &sqlx::sqlite::SqliteRow) -> Result<AccessRow> {
    let role_id_str: String = row.get("role_id");
    let role_id = Uuid::parse_str(&role_id_str)
        .map_err(|_| anyhow::anyhow!("Invalid role id in module_access: {}", role_id_str))?;

    Ok(AccessRow {
        module_id: row.get("module_id"),
        role_id,
        has_access: row.get("has_access"),
    })
}
