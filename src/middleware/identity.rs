//! Caller identity
//!
//! Authentication happens upstream. The upstream layer forwards the role it
//! resolved for the session in a trusted header; a request without it acts as
//! the unauthenticated pseudo-role.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::{models::RoleKey, utils::AppError, AppState};

/// Role the current request acts under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub role: RoleKey,
}

impl AuthUser {
    pub fn unauthenticated() -> Self {
        Self {
            role: RoleKey::Unauthenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_authenticated()
    }
}

/// Resolve the caller's role from the configured header
pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(state.config.auth.role_header.as_str())
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::Unauthorized("Role header is not valid text".to_string()))
        })
        .transpose()?;

    let role = RoleKey::from_session(header)
        .map_err(|e| AppError::Unauthorized(format!("Unrecognized role: {}", e)))?;

    debug!(role = %role, path = %request.uri().path(), "Resolved caller role");
    request.extensions_mut().insert(AuthUser { role });

    Ok(next.run(request).await)
}

/// Extractor for the caller identity
///
/// Falls back to the unauthenticated pseudo-role when the identity middleware
/// did not run for the route.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .unwrap_or_else(AuthUser::unauthenticated))
    }
}
