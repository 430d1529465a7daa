//! Role management API endpoints
//!
//! Role changes alter the columns of the permission matrix, so every
//! successful write is followed by a reload of the access engine.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    models::{CreateRoleRequest, Role, UpdateRoleRequest},
    utils::AppResult,
    AppState,
};

/// Create routes for role management
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/{id}", get(get_role).put(update_role).delete(delete_role))
}

async fn refresh_access(state: &AppState) {
    if let Err(e) = state.access.reload().await {
        warn!(error = %e, "Permission reload after role change failed");
    }
}

/// List all roles
///
/// GET /api/v1/roles
async fn list_roles(State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    Ok(Json(state.roles.list().await?))
}

/// Get a role by ID
///
/// GET /api/v1/roles/{id}
async fn get_role(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Json<Role>> {
    Ok(Json(state.roles.get(&id).await?))
}

/// Create a new role
///
/// POST /api/v1/roles
async fn create_role(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> AppResult<(StatusCode, Json<Role>)> {
    let role = state.roles.create(payload).await?;
    refresh_access(&state).await;
    Ok((StatusCode::CREATED, Json(role)))
}

/// Update a role's display fields
///
/// PUT /api/v1/roles/{id}
async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<Role>> {
    let role = state.roles.update(&id, payload).await?;
    refresh_access(&state).await;
    Ok(Json(role))
}

/// Delete a role
///
/// DELETE /api/v1/roles/{id}
async fn delete_role(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    state.roles.delete(&id).await?;
    refresh_access(&state).await;
    Ok(StatusCode::NO_CONTENT)
}
