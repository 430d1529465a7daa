//! Common test utilities and helpers
//!
//! Shared infrastructure for the integration tests:
//! - Navigation tree and role fixtures
//! - Test application with a temporary SQLite database

pub mod fixtures;
pub mod test_app;

pub use fixtures::*;
pub use test_app::*;
