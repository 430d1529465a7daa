//! SQLite-backed role store

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::RoleStore;
use crate::models::Role;

const ROLE_COLUMNS: &str =
    "id, name, display_name, description, is_system, created_at, updated_at";

/// Repository for the `roles` table
#[derive(Clone)]
pub struct SqliteRoleStore {
    pool: SqlitePool,
}

impl SqliteRoleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for SqliteRoleStore {
    async fn list(&self) -> Result<Vec<Role>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM roles ORDER BY is_system DESC, name ASC",
            ROLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch roles")?;

        rows.iter().map(row_to_role).collect()
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Role>> {
        let row = sqlx::query(&format!("SELECT {} FROM roles WHERE id = ?", ROLE_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch role")?;

        row.as_ref().map(row_to_role).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        let row = sqlx::query(&format!("SELECT {} FROM roles WHERE name = ?", ROLE_COLUMNS))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch role by name")?;

        row.as_ref().map(row_to_role).transpose()
    }

    async fn insert(&self, role: &Role) -> Result<()> {
        sqlx::query(
            "INSERT INTO roles (id, name, display_name, description, is_system, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(role.id.to_string())
        .bind(&role.name)
        .bind(&role.display_name)
        .bind(&role.description)
        .bind(role.is_system)
        .bind(role.created_at.to_rfc3339())
        .bind(role.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to create role")?;

        Ok(())
    }

    async fn update(&self, role: &Role) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE roles SET display_name = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&role.display_name)
        .bind(&role.description)
        .bind(role.updated_at.to_rfc3339())
        .bind(role.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update role")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete role")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_role(row: &sqlx::sqlite::SqliteRow) -> Result<Role> {
    let id_str: String = row.get("id");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    Ok(Role {
        id: Uuid::parse_str(&id_str).map_err(|_| anyhow::anyhow!("Invalid UUID: {}", id_str))?,
        name: row.get("name"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        is_system: row.get("is_system"),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}
