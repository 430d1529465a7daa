//! Permission matrix API endpoints

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    middleware::AuthUser,
    models::{AccessEditRequest, AccessEditResponse, MergeReport, PermissionMatrix, ReloadSource, RoleKey},
    utils::{AppError, AppResult},
    AppState,
};

/// Full permission matrix
///
/// GET /api/v1/permissions
pub async fn get_matrix(State(state): State<AppState>) -> Json<PermissionMatrix> {
    Json(state.access.matrix())
}

/// Change one cell; the value cascades to every descendant module
///
/// PUT /api/v1/permissions
///
/// When the store rejects the write, the error body carries the pending edit
/// under `details` so the client can retry it.
pub async fn update_access(
    State(state): State<AppState>,
    Json(payload): Json<AccessEditRequest>,
) -> Result<Json<AccessEditResponse>, Response> {
    let role: RoleKey = payload
        .role
        .parse()
        .map_err(|e| AppError::from(e).into_response())?;

    match state
        .access
        .apply_and_persist(&payload.module_id, &role, payload.has_access)
        .await
    {
        Ok(response) => Ok(Json(response)),
        Err(e) if e.is_persistence() => {
            let pending = serde_json::to_value(&payload).ok();
            Err(AppError::from(e).into_response_with_details(pending))
        }
        Err(e) => Err(AppError::from(e).into_response()),
    }
}

/// Query for an access check
#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub module_id: String,
    /// Role to check; defaults to the caller's role
    pub role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub module_id: String,
    pub role: String,
    pub allowed: bool,
}

/// Whether a role may open a module
///
/// GET /api/v1/permissions/check?module_id=...&role=...
///
/// Any caller may check its own role. Checking another role requires access
/// to the permission management module.
pub async fn check_access(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CheckQuery>,
) -> AppResult<Json<CheckResponse>> {
    let role = match query.role.as_deref() {
        None => user.role.clone(),
        Some(raw) => raw.parse::<RoleKey>()?,
    };

    if role != user.role {
        if !user.is_authenticated() {
            return Err(AppError::Unauthorized("Authentication required".to_string()));
        }
        if !state
            .access
            .can_access(&state.config.access.admin_module_id, &user.role)
        {
            return Err(AppError::Forbidden(
                "Checking another role requires permission management access".to_string(),
            ));
        }
    }

    let allowed = state.access.can_access(&query.module_id, &role);
    Ok(Json(CheckResponse {
        module_id: query.module_id,
        role: role.to_string(),
        allowed,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub source: ReloadSource,
    pub applied: usize,
    pub stale: usize,
    pub orphaned: usize,
    pub ignored: usize,
}

impl ReloadResponse {
    fn new(source: ReloadSource, report: MergeReport) -> Self {
        Self {
            source,
            applied: report.applied,
            stale: report.stale,
            orphaned: report.orphaned,
            ignored: report.ignored,
        }
    }
}

/// Rebuild the permission table from the store
///
/// POST /api/v1/permissions/reload
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<ReloadResponse>> {
    let report = state.access.reload().await?;
    Ok(Json(ReloadResponse::new(state.access.source(), report)))
}
