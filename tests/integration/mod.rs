//! Integration tests for the module access service
//!
//! These tests run the API and the access engine against a real SQLite
//! database with all middleware in place.

mod access_service_tests;
mod api_tests;
