//! Middleware components
//!
//! - Caller identity (trusted role header)
//! - Module access guard

pub mod identity;
pub mod module_guard;

pub use identity::{identity_middleware, AuthUser};
pub use module_guard::{require_module_middleware, RequireModule};
