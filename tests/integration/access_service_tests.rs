//! Access engine tests against the SQLite stores
//!
//! These cover behavior that only shows up across reloads or restarts:
//! persisted edits, rows left behind by deleted roles and rows for modules
//! the navigation tree no longer has.

use module_access::{
    db::{AccessStore, SqliteAccessStore},
    models::{AccessRow, CreateRoleRequest, ReloadSource, RoleKey},
};

use crate::common::{ids, TestApp};

fn key(name: &str) -> RoleKey {
    name.parse().unwrap()
}

#[tokio::test]
async fn test_edit_survives_restart() {
    let app = TestApp::new().await;
    let slug = app.create_role("Auditor").await;

    app.state
        .access
        .apply_and_persist("billing", &key(&slug), true)
        .await
        .unwrap();

    let restarted = TestApp::access_service(&app.state.config, &app.state.db).unwrap();
    assert!(!restarted.can_access("invoices", &key(&slug)));

    let report = restarted.reload().await.unwrap();
    assert_eq!(report.applied, 3);
    assert_eq!(restarted.source(), ReloadSource::Merged);
    assert!(restarted.can_access("billing", &key(&slug)));
    assert!(restarted.can_access("invoices", &key(&slug)));
    assert!(restarted.can_access("payment-methods", &key(&slug)));
    assert!(!restarted.can_access("dashboard", &key("unknown-role")));
}

#[tokio::test]
async fn test_rows_of_deleted_role_are_stale() {
    let app = TestApp::new().await;
    let role = app
        .state
        .roles
        .create(CreateRoleRequest {
            display_name: "Contractor".to_string(),
            description: None,
        })
        .await
        .unwrap();
    app.state.access.reload().await.unwrap();

    let response = app
        .state
        .access
        .apply_and_persist("projects", &key("contractor"), false)
        .await
        .unwrap();
    assert_eq!(
        response.changed_module_ids,
        vec!["projects".to_string(), "projects-archive".to_string()]
    );

    app.state.roles.delete(&role.id).await.unwrap();
    let report = app.state.access.reload().await.unwrap();

    assert_eq!(report.stale, 2);
    assert_eq!(report.applied, 0);
    assert!(!app.state.access.can_access("projects", &key("contractor")));
}

#[tokio::test]
async fn test_rows_for_unknown_modules_become_orphans() {
    let app = TestApp::new().await;
    let store = SqliteAccessStore::new(app.state.db.clone());
    store
        .replace_rows_for_modules(
            &["legacy-reports".to_string()],
            &[AccessRow::new("legacy-reports", ids::user_role(), true)],
        )
        .await
        .unwrap();

    let report = app.state.access.reload().await.unwrap();
    assert_eq!(report.orphaned, 1);
    assert_eq!(report.applied, 1);

    assert!(app.state.access.can_access("legacy-reports", &RoleKey::Admin));
    assert!(app.state.access.can_access("legacy-reports", &key("user")));

    let matrix = app.state.access.matrix();
    let orphan = matrix
        .modules
        .iter()
        .find(|m| m.module_id == "legacy-reports")
        .unwrap();
    assert_eq!(orphan.parent_id, None);
}

#[tokio::test]
async fn test_stored_rows_cannot_revoke_fixed_access() {
    let app = TestApp::new().await;
    let store = SqliteAccessStore::new(app.state.db.clone());
    store
        .replace_rows_for_modules(
            &["dashboard".to_string(), "account-logout".to_string()],
            &[
                AccessRow::new("dashboard", ids::admin_role(), false),
                AccessRow::new("account-logout", ids::user_role(), false),
            ],
        )
        .await
        .unwrap();

    let report = app.state.access.reload().await.unwrap();
    assert_eq!(report.ignored, 2);
    assert_eq!(report.applied, 0);

    assert!(app.state.access.can_access("dashboard", &RoleKey::Admin));
    assert!(app.state.access.can_access("account-logout", &key("user")));
    assert!(!app
        .state
        .access
        .can_access("account-logout", &RoleKey::Unauthenticated));
}

#[tokio::test]
async fn test_repeated_edit_is_idempotent() {
    let app = TestApp::new().await;

    for _ in 0..2 {
        app.state
            .access
            .apply_and_persist("workspace", &key("user"), false)
            .await
            .unwrap();
    }

    let rows = SqliteAccessStore::new(app.state.db.clone())
        .read_all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| !row.has_access));
    assert!(!app.state.access.can_access("projects-archive", &key("user")));
}
