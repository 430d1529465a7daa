//! Test fixtures for common test data

use module_access::models::{ModuleTree, SystemRole};
use uuid::Uuid;

/// Navigation tree shared by the integration tests
///
/// `workspace` and `account` are open, `billing` requires `finance` and the
/// permission management module is admin only.
pub const NAVIGATION_YAML: &str = r#"
sections:
  - id: workspace
    title: Workspace
    items:
      - id: dashboard
        label: Dashboard
      - id: projects
        label: Projects
        children:
          - id: projects-archive
            label: Archive
            required_roles: [editor]
  - id: billing
    title: Billing
    required_roles: [finance]
    items:
      - id: invoices
        label: Invoices
      - id: payment-methods
        label: Payment methods
  - id: admin
    title: Administration
    items:
      - id: admin-permissions
        label: Permissions
        required_roles: [admin]
  - id: account
    title: Account
    items:
      - id: account-profile
        label: Profile
      - id: account-logout
        label: Sign out
"#;

pub fn navigation_tree() -> ModuleTree {
    ModuleTree::from_yaml(NAVIGATION_YAML).expect("fixture navigation tree must parse")
}

/// Fixed ids of the seeded roles
pub mod ids {
    use super::*;

    pub fn admin_role() -> Uuid {
        SystemRole::Admin.uuid()
    }

    pub fn user_role() -> Uuid {
        SystemRole::User.uuid()
    }
}
