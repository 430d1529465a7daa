//! Role registry
//!
//! CRUD over the role table. Role slugs are derived from the display name on
//! creation and never change afterwards. System roles cannot be modified or
//! deleted, and deleting a role leaves its access rows in place (they are
//! skipped as stale on the next reload).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::db::RoleStore;
use crate::models::{CreateRoleRequest, Role, UpdateRoleRequest, UNAUTHENTICATED_ROLE};
use crate::utils::{
    validation::{slugify, validate_role_slug},
    AccessError, AccessResult,
};

pub struct RoleRegistry {
    store: Arc<dyn RoleStore>,
    store_timeout: Duration,
    write_lock: Mutex<()>,
}

impl RoleRegistry {
    pub fn new(store: Arc<dyn RoleStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            store_timeout,
            write_lock: Mutex::new(()),
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

    /// System roles first, then by name
    pub async fn list(&self) -> AccessResult<Vec<Role>> {
        self.timed(self.store.list()).await
    }

    pub async fn get(&self, id: &Uuid) -> AccessResult<Role> {
        self.timed(self.store.get(id))
            .await?
            .ok_or_else(|| AccessError::NotFound(format!("role {}", id)))
    }

    pub async fn create(&self, request: CreateRoleRequest) -> AccessResult<Role> {
        let display_name = clean_display_name(&request.display_name)?;
        let name = slugify(&display_name);
        if name.is_empty() {
            return Err(AccessError::Validation(format!(
                "'{}' does not produce a usable role name",
                request.display_name
            )));
        }
        if name == UNAUTHENTICATED_ROLE {
            return Err(AccessError::Conflict(format!(
                "'{}' is a reserved role name",
                name
            )));
        }
        if !validate_role_slug(&name) {
            return Err(AccessError::Validation(format!(
                "role name derived from '{}' is too long",
                display_name
            )));
        }

        let _guard = self.write_lock.lock().await;
        if self.timed(self.store.find_by_name(&name)).await?.is_some() {
            return Err(AccessError::Conflict(format!(
                "Role with name '{}' already exists",
                name
            )));
        }

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            name,
            display_name,
            description: clean_description(request.description),
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        self.timed(self.store.insert(&role)).await?;

        info!(role = %role.name, id = %role.id, "Role created");
        Ok(role)
    }

    pub async fn update(&self, id: &Uuid, request: UpdateRoleRequest) -> AccessResult<Role> {
        let display_name = clean_display_name(&request.display_name)?;

        let _guard = self.write_lock.lock().await;
        let mut role = self.get(id).await?;
        if role.is_system {
            return Err(AccessError::SystemRoleProtected(role.name));
        }

        role.display_name = display_name;
        role.description = clean_description(request.description);
        role.updated_at = Utc::now();

        if !self.timed(self.store.update(&role)).await? {
            return Err(AccessError::NotFound(format!("role {}", id)));
        }

        info!(role = %role.name, id = %role.id, "Role updated");
        Ok(role)
    }

    pub async fn delete(&self, id: &Uuid) -> AccessResult<()> {
        let _guard = self.write_lock.lock().await;
        let role = self.get(id).await?;
        if role.is_system {
            return Err(AccessError::SystemRoleProtected(role.name));
        }

        if !self.timed(self.store.delete(id)).await? {
            return Err(AccessError::NotFound(format!("role {}", id)));
        }

        info!(role = %role.name, id = %role.id, "Role deleted");
        Ok(())
    }
}

fn clean_display_name(display_name: &str) -> AccessResult<String> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(AccessError::Validation(
            "display_name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
