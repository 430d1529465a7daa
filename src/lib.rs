//! Module Access Library
//!
//! Role-based access control for the navigable modules of an application shell:
//! default access derived from the navigation tree, stored per-role overrides,
//! cascading edits over the module hierarchy and a role registry.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::AuthUser;
pub use services::{AccessService, RoleRegistry};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Access engine
    pub access: Arc<AccessService>,
    /// Role registry
    pub roles: Arc<RoleRegistry>,
}
