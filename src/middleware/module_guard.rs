//! Module access guard
//!
//! Route middleware that consults the access engine before letting a request
//! through to a module's handlers.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{utils::AppError, AppState};

use super::identity::AuthUser;

/// Module a route group belongs to
#[derive(Debug, Clone)]
pub struct RequireModule {
    pub module_id: String,
}

impl RequireModule {
    pub fn new(module_id: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
        }
    }
}

/// Reject requests whose role cannot open the module
///
/// Usage:
/// ```ignore
/// let app = Router::new()
///     .route("/permissions", get(get_matrix))
///     .layer(axum::middleware::from_fn_with_state(
///         state.clone(),
///         |state: State<AppState>, req: Request, next: Next| require_module_middleware(
///             state,
///             req,
///             next,
///             RequireModule::new("admin-permissions"),
///         ),
///     ));
/// ```
pub async fn require_module_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
    required: RequireModule,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .unwrap_or_else(AuthUser::unauthenticated);

    if !user.is_authenticated() {
        return Err(AppError::Unauthorized("Authentication required".to_string()));
    }

    if !state.access.can_access(&required.module_id, &user.role) {
        warn!(
            role = %user.role,
            module_id = %required.module_id,
            path = %request.uri().path(),
            "Module access denied"
        );
        return Err(AppError::Forbidden(format!(
            "Role '{}' cannot access module '{}'",
            user.role, required.module_id
        )));
    }

    Ok(next.run(request).await)
}
