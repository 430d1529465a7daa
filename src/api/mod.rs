//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{
    extract::{Request, State},
    middleware::Next,
    routing::{get, post},
    Router,
};

use crate::{
    middleware::{identity_middleware, require_module_middleware, RequireModule},
    AppState,
};

mod health;
mod permissions;
mod roles;

pub use health::*;
pub use permissions::{CheckQuery, CheckResponse, ReloadResponse};

/// Routes open to any caller
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/ready", get(health::readiness))
        .route("/permissions/check", get(permissions::check_access))
}

/// Permission and role management, guarded by the admin module
pub fn management_routes(state: &AppState) -> Router<AppState> {
    let admin_module = state.config.access.admin_module_id.clone();

    Router::new()
        .route(
            "/permissions",
            get(permissions::get_matrix).put(permissions::update_access),
        )
        .route("/permissions/reload", post(permissions::reload))
        .nest("/roles", roles::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            move |state: State<AppState>, req: Request, next: Next| {
                require_module_middleware(state, req, next, RequireModule::new(admin_module.clone()))
            },
        ))
}

/// Every API route, with caller identity resolved for all of them
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .merge(management_routes(state))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ))
}
