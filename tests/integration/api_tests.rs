//! API integration tests
//!
//! Drives the router end to end against a temporary SQLite database.

use serde_json::{json, Value};

use crate::common::{ids, TestApp};

fn module<'a>(matrix: &'a Value, id: &str) -> &'a Value {
    matrix["modules"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["module_id"] == id)
        .unwrap_or_else(|| panic!("module {} missing from matrix", id))
}

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/health").await;

    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_detailed_health_reports_merged_permissions() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/health/detailed").await;

    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["components"]["database"]["status"], "healthy");
    assert_eq!(json["components"]["permissions"]["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::new().await;
    app.get("/api/v1/health/ready").await.assert_ok();
}

#[tokio::test]
async fn test_matrix_requires_a_role() {
    let app = TestApp::new().await;
    app.get("/api/v1/permissions").await.assert_unauthorized();
}

#[tokio::test]
async fn test_matrix_forbidden_without_management_access() {
    let app = TestApp::new().await;
    app.get_as("/api/v1/permissions", "user")
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_malformed_role_header_is_rejected() {
    let app = TestApp::new().await;
    app.get_as("/api/v1/health", "Not A Role")
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn test_admin_reads_matrix() {
    let app = TestApp::new().await;
    let response = app.get_as("/api/v1/permissions", "admin").await;

    response.assert_ok();
    let matrix: Value = response.json();
    assert_eq!(matrix["source"], "merged");

    let role_names: Vec<&str> = matrix["roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(role_names, vec!["admin", "user"]);

    let dashboard = module(&matrix, "dashboard");
    assert_eq!(dashboard["parent_id"], "workspace");
    assert_eq!(dashboard["role_access"]["user"], true);
    assert_eq!(module(&matrix, "invoices")["role_access"]["user"], false);
    assert_eq!(module(&matrix, "admin-permissions")["role_access"]["admin"], true);

    let has_logout = matrix["modules"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m["module_id"] == "account-logout");
    assert!(!has_logout);
}

#[tokio::test]
async fn test_check_own_role() {
    let app = TestApp::new().await;

    let response = app
        .get_as("/api/v1/permissions/check?module_id=dashboard", "user")
        .await;
    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["role"], "user");
    assert_eq!(json["allowed"], true);

    let json: Value = app
        .get_as("/api/v1/permissions/check?module_id=invoices", "user")
        .await
        .json();
    assert_eq!(json["allowed"], false);

    let json: Value = app
        .get_as("/api/v1/permissions/check?module_id=account-logout", "user")
        .await
        .json();
    assert_eq!(json["allowed"], true);
}

#[tokio::test]
async fn test_check_without_session_is_denied() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/permissions/check?module_id=dashboard").await;

    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["role"], "unauthenticated");
    assert_eq!(json["allowed"], false);
}

#[tokio::test]
async fn test_check_other_role_needs_management_access() {
    let app = TestApp::new().await;

    app.get_as("/api/v1/permissions/check?module_id=invoices&role=admin", "user")
        .await
        .assert_forbidden();
    app.get("/api/v1/permissions/check?module_id=invoices&role=user")
        .await
        .assert_unauthorized();

    let json: Value = app
        .get_as("/api/v1/permissions/check?module_id=invoices&role=user", "admin")
        .await
        .json();
    assert_eq!(json["allowed"], false);
}

#[tokio::test]
async fn test_new_role_picks_up_navigation_defaults() {
    let app = TestApp::new().await;
    let slug = app.create_role("Finance").await;
    assert_eq!(slug, "finance");

    let json: Value = app
        .get_as("/api/v1/permissions/check?module_id=payment-methods", "finance")
        .await
        .json();
    assert_eq!(json["allowed"], true);

    let matrix: Value = app.get_as("/api/v1/permissions", "admin").await.json();
    assert_eq!(module(&matrix, "invoices")["role_access"]["finance"], true);
    assert_eq!(module(&matrix, "projects-archive")["role_access"]["finance"], false);
}

#[tokio::test]
async fn test_edit_cascades_to_descendants() {
    let app = TestApp::new().await;
    let slug = app.create_role("Editor Team").await;
    assert_eq!(slug, "editor-team");

    let response = app
        .put_json_as(
            "/api/v1/permissions",
            json!({ "module_id": "workspace", "role": slug, "has_access": false }),
            "admin",
        )
        .await;
    response.assert_ok();

    let json: Value = response.json();
    assert_eq!(
        json["changed_module_ids"],
        json!(["workspace", "dashboard", "projects", "projects-archive"])
    );
    assert_eq!(
        module(&json["matrix"], "projects")["role_access"]["editor-team"],
        false
    );
    assert_eq!(
        module(&json["matrix"], "projects")["role_access"]["user"],
        true
    );

    let check: Value = app
        .get_as("/api/v1/permissions/check?module_id=dashboard", "editor-team")
        .await
        .json();
    assert_eq!(check["allowed"], false);

    let check: Value = app
        .get_as("/api/v1/permissions/check?module_id=account-profile", "editor-team")
        .await
        .json();
    assert_eq!(check["allowed"], true);
}

#[tokio::test]
async fn test_edit_requires_management_access() {
    let app = TestApp::new().await;
    let body = json!({ "module_id": "dashboard", "role": "user", "has_access": false });

    app.put_json("/api/v1/permissions", body.clone())
        .await
        .assert_unauthorized();
    app.put_json_as("/api/v1/permissions", body, "user")
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_edit_rejects_fixed_cells() {
    let app = TestApp::new().await;

    for body in [
        json!({ "module_id": "dashboard", "role": "admin", "has_access": false }),
        json!({ "module_id": "dashboard", "role": "unauthenticated", "has_access": true }),
        json!({ "module_id": "account-logout", "role": "user", "has_access": false }),
    ] {
        app.put_json_as("/api/v1/permissions", body, "admin")
            .await
            .assert_bad_request();
    }
}

#[tokio::test]
async fn test_edit_unknown_module_or_role() {
    let app = TestApp::new().await;

    app.put_json_as(
        "/api/v1/permissions",
        json!({ "module_id": "nowhere", "role": "user", "has_access": true }),
        "admin",
    )
    .await
    .assert_not_found();

    app.put_json_as(
        "/api/v1/permissions",
        json!({ "module_id": "dashboard", "role": "ghost", "has_access": true }),
        "admin",
    )
    .await
    .assert_not_found();
}

#[tokio::test]
async fn test_reload_reports_source() {
    let app = TestApp::new().await;
    let response = app
        .post_json_as("/api/v1/permissions/reload", json!({}), "admin")
        .await;

    response.assert_ok();
    let json: Value = response.json();
    assert_eq!(json["source"], "merged");
    assert_eq!(json["applied"], 0);
}

#[tokio::test]
async fn test_role_slug_conflict() {
    let app = TestApp::new().await;
    let slug = app.create_role("Super Admin!!").await;
    assert_eq!(slug, "super-admin");

    app.post_json_as(
        "/api/v1/roles",
        json!({ "display_name": "super admin" }),
        "admin",
    )
    .await
    .assert_conflict();

    let roles: Vec<Value> = app.get_as("/api/v1/roles", "admin").await.json();
    assert_eq!(roles.len(), 3);
}

#[tokio::test]
async fn test_overlong_role_name_is_invalid() {
    let app = TestApp::new().await;
    app.post_json_as(
        "/api/v1/roles",
        json!({ "display_name": "x".repeat(150) }),
        "admin",
    )
    .await
    .assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);

    let roles: Vec<Value> = app.get_as("/api/v1/roles", "admin").await.json();
    assert_eq!(roles.len(), 2);
}

#[tokio::test]
async fn test_reserved_role_names_conflict() {
    let app = TestApp::new().await;

    for name in ["Admin", "Unauthenticated"] {
        app.post_json_as("/api/v1/roles", json!({ "display_name": name }), "admin")
            .await
            .assert_conflict();
    }
}

#[tokio::test]
async fn test_role_without_slug_characters_is_invalid() {
    let app = TestApp::new().await;
    app.post_json_as("/api/v1/roles", json!({ "display_name": "!!!" }), "admin")
        .await
        .assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_system_roles_are_protected() {
    let app = TestApp::new().await;

    app.put_json_as(
        &format!("/api/v1/roles/{}", ids::admin_role()),
        json!({ "display_name": "Root" }),
        "admin",
    )
    .await
    .assert_forbidden();

    app.delete_as(&format!("/api/v1/roles/{}", ids::user_role()), "admin")
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_role_lifecycle() {
    let app = TestApp::new().await;
    let response = app
        .post_json_as(
            "/api/v1/roles",
            json!({ "display_name": "Support", "description": "  First line  " }),
            "admin",
        )
        .await;
    response.assert_created();
    let role: Value = response.json();
    assert_eq!(role["description"], "First line");
    assert_eq!(role["is_system"], false);
    let uri = format!("/api/v1/roles/{}", role["id"].as_str().unwrap());

    let response = app
        .put_json_as(&uri, json!({ "display_name": "Customer Support" }), "admin")
        .await;
    response.assert_ok();
    let updated: Value = response.json();
    assert_eq!(updated["name"], "support");
    assert_eq!(updated["display_name"], "Customer Support");

    let roles: Vec<Value> = app.get_as("/api/v1/roles", "admin").await.json();
    assert_eq!(roles.len(), 3);

    app.delete_as(&uri, "admin")
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);
    app.get_as(&uri, "admin").await.assert_not_found();

    let matrix: Value = app.get_as("/api/v1/permissions", "admin").await.json();
    assert!(module(&matrix, "dashboard")["role_access"]
        .get("support")
        .is_none());
}
