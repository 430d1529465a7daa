//! Test application setup utilities
//!
//! Builds the full router over a throwaway SQLite file, with the same
//! middleware stack the binary uses.

use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;
use uuid::Uuid;

use module_access::{
    api,
    config::{AppConfig, DatabaseConfig},
    db::{self, SqliteAccessStore, SqliteRoleStore},
    AccessService, AppState, RoleRegistry,
};

use super::fixtures::navigation_tree;

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with a fresh database
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let access = Arc::new(
            Self::access_service(&config, &db).expect("Fixture tree must be valid"),
        );
        access
            .reload()
            .await
            .expect("Initial permission load failed");

        let roles = Arc::new(RoleRegistry::new(
            Arc::new(SqliteRoleStore::new(db.clone())),
            config.access.store_timeout(),
        ));

        let state = AppState {
            config,
            db,
            access,
            roles,
        };

        let router = Router::new()
            .nest("/api/v1", api::routes(&state))
            .with_state(state.clone());

        Self { router, state }
    }

    /// A second engine over the same database, as after a restart
    pub fn access_service(
        config: &AppConfig,
        db: &db::DbPool,
    ) -> module_access::utils::AccessResult<AccessService> {
        AccessService::new(
            &navigation_tree(),
            &config.access,
            Arc::new(SqliteAccessStore::new(db.clone())),
            Arc::new(SqliteRoleStore::new(db.clone())),
        )
    }

    /// Make a GET request without a role
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(get_request(uri)).await
    }

    /// Make a GET request acting as `role`
    pub async fn get_as(&self, uri: &str, role: &str) -> TestResponse {
        self.request_as(get_request(uri), role).await
    }

    /// Make a POST request with JSON body acting as `role`
    pub async fn post_json_as(&self, uri: &str, body: serde_json::Value, role: &str) -> TestResponse {
        self.request_as(json_request("POST", uri, body), role).await
    }

    /// Make a PUT request with JSON body acting as `role`
    pub async fn put_json_as(&self, uri: &str, body: serde_json::Value, role: &str) -> TestResponse {
        self.request_as(json_request("PUT", uri, body), role).await
    }

    /// Make a PUT request with JSON body without a role
    pub async fn put_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(json_request("PUT", uri, body)).await
    }

    /// Make a DELETE request acting as `role`
    pub async fn delete_as(&self, uri: &str, role: &str) -> TestResponse {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.request_as(request, role).await
    }

    /// Create a custom role as admin and return its slug
    pub async fn create_role(&self, display_name: &str) -> String {
        let response = self
            .post_json_as(
                "/api/v1/roles",
                serde_json::json!({ "display_name": display_name }),
                "admin",
            )
            .await;
        response.assert_created();
        let role: serde_json::Value = response.json();
        role["name"].as_str().unwrap().to_string()
    }

    /// Make a request with the role header set
    pub async fn request_as(&self, request: Request<Body>, role: &str) -> TestResponse {
        let (mut parts, body) = request.into_parts();
        parts.headers.insert(
            axum::http::HeaderName::from_bytes(self.state.config.auth.role_header.as_bytes())
                .unwrap(),
            role.parse().unwrap(),
        );
        self.request(Request::from_parts(parts, body)).await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    /// Assert the response status is Created (201)
    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    /// Assert the response status is Bad Request (400)
    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    /// Assert the response status is Unauthorized (401)
    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    /// Assert the response status is Forbidden (403)
    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    /// Assert the response status is Not Found (404)
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    /// Assert the response status is Conflict (409)
    pub fn assert_conflict(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CONFLICT)
    }
}

/// Create a test configuration with a temporary SQLite database
pub fn test_config() -> AppConfig {
    // Unique file per test so parallel tests never share state
    let db_path = format!(
        "/tmp/module_access_test_{}.db",
        Uuid::new_v4().to_string().replace('-', "")
    );

    AppConfig {
        database: DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", db_path),
            max_connections: 1,
            min_connections: 1,
            ..DatabaseConfig::default()
        },
        ..AppConfig::default()
    }
}
