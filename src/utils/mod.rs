//! Shared utilities

pub mod error;
pub mod validation;

pub use error::{AccessError, AccessResult, AppError, AppResult, ErrorResponse};
