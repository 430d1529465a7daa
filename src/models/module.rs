//! Navigation module tree
//!
//! The tree is static configuration owned by the application shell. The access
//! engine only reads module identity, labels, parent links and the optional
//! `required_roles` list that drives default access.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::utils::AccessError;

/// Module id reserved for the sign-out entry
pub const DEFAULT_LOGOUT_MODULE_ID: &str = "account-logout";

/// A navigable item, possibly with nested children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavItem {
    pub id: String,
    pub label: String,
    /// Roles granted by default. `None` inherits from the parent; an empty list is open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}

impl NavItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.required_roles = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn with_children(mut self, children: Vec<NavItem>) -> Self {
        self.children = children;
        self
    }
}

/// A top-level navigation section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavSection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_roles: Option<Vec<String>>,
    #[serde(default)]
    pub items: Vec<NavItem>,
}

impl NavSection {
    pub fn new(id: impl Into<String>, items: Vec<NavItem>) -> Self {
        Self {
            id: id.into(),
            items,
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.required_roles = Some(roles.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Label shown for the section (title, falling back to the id)
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// A module declared with an explicit parent pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatModule {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub required_roles: Option<Vec<String>>,
}

/// On-disk navigation file, nested or flat
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NavigationFile {
    Nested { sections: Vec<NavSection> },
    Flat { modules: Vec<FlatModule> },
}

/// Read-only hierarchy of sections, items and nested children
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleTree {
    sections: Vec<NavSection>,
}

impl ModuleTree {
    pub fn new(sections: Vec<NavSection>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[NavSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Build a tree from modules that point at their parent
    ///
    /// Modules without a parent become sections. Fails when a parent id is
    /// unknown, an id repeats, or the parent links form a cycle.
    pub fn from_flat(modules: Vec<FlatModule>) -> Result<Self, AccessError> {
        let mut by_id: HashMap<&str, &FlatModule> = HashMap::new();
        for module in &modules {
            if by_id.insert(module.id.as_str(), module).is_some() {
                return Err(AccessError::Config(format!(
                    "duplicate module id '{}'",
                    module.id
                )));
            }
        }

        let mut children: HashMap<&str, Vec<&FlatModule>> = HashMap::new();
        let mut roots = Vec::new();
        for module in &modules {
            match module.parent_id.as_deref() {
                None => roots.push(module),
                Some(parent) if by_id.contains_key(parent) => {
                    children.entry(parent).or_default().push(module)
                }
                Some(parent) => {
                    return Err(AccessError::Config(format!(
                        "module '{}' references unknown parent '{}'",
                        module.id, parent
                    )))
                }
            }
        }

        let mut placed = HashSet::new();
        let mut sections = Vec::with_capacity(roots.len());
        for root in roots {
            placed.insert(root.id.as_str());
            sections.push(NavSection {
                id: root.id.clone(),
                title: Some(root.label.clone()),
                required_roles: root.required_roles.clone(),
                items: build_items(&root.id, &children, &mut placed),
            });
        }

        if placed.len() != modules.len() {
            let mut unreachable: Vec<&str> = modules
                .iter()
                .map(|m| m.id.as_str())
                .filter(|id| !placed.contains(id))
                .collect();
            unreachable.sort_unstable();
            return Err(AccessError::Config(format!(
                "parent links form a cycle through: {}",
                unreachable.join(", ")
            )));
        }

        Ok(Self { sections })
    }

    /// Parse a navigation file in either the nested or flat shape
    pub fn from_yaml(contents: &str) -> Result<Self, AccessError> {
        let file: NavigationFile = serde_norway::from_str(contents)
            .map_err(|e| AccessError::Config(format!("invalid navigation file: {}", e)))?;

        match file {
            NavigationFile::Nested { sections } => Ok(Self::new(sections)),
            NavigationFile::Flat { modules } => Self::from_flat(modules),
        }
    }

    /// Load the navigation file from disk
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read navigation file: {:?}", path))?;
        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse navigation file: {:?}", path))
    }
}

fn build_items<'a>(
    parent: &str,
    children: &HashMap<&str, Vec<&'a FlatModule>>,
    placed: &mut HashSet<&'a str>,
) -> Vec<NavItem> {
    let Some(kids) = children.get(parent) else {
        return Vec::new();
    };

    let mut items = Vec::with_capacity(kids.len());
    for &module in kids {
        if !placed.insert(module.id.as_str()) {
            continue;
        }
        items.push(NavItem {
            id: module.id.clone(),
            label: module.label.clone(),
            required_roles: module.required_roles.clone(),
            children: build_items(&module.id, children, placed),
        });
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(id: &str, parent: Option<&str>) -> FlatModule {
        FlatModule {
            id: id.to_string(),
            label: id.to_uppercase(),
            parent_id: parent.map(str::to_string),
            required_roles: None,
        }
    }

    #[test]
    fn test_nested_yaml_parsing() {
        let yaml = r#"
sections:
  - id: workspace
    title: Workspace
    items:
      - id: dashboard
        label: Dashboard
      - id: billing
        label: Billing
        required_roles: [finance]
        children:
          - id: invoices
            label: Invoices
  - id: account
    items:
      - id: account-logout
        label: Sign out
"#;
        let tree = ModuleTree::from_yaml(yaml).unwrap();
        assert_eq!(tree.sections().len(), 2);
        assert_eq!(tree.sections()[0].label(), "Workspace");
        assert_eq!(tree.sections()[1].label(), "account");

        let billing = &tree.sections()[0].items[1];
        assert_eq!(billing.required_roles, Some(vec!["finance".to_string()]));
        assert_eq!(billing.children[0].id, "invoices");
    }

    #[test]
    fn test_flat_yaml_parsing() {
        let yaml = r#"
modules:
  - id: admin
    label: Administration
  - id: admin-users
    label: Users
    parent_id: admin
    required_roles: [support]
  - id: admin-users-invite
    label: Invite
    parent_id: admin-users
"#;
        let tree = ModuleTree::from_yaml(yaml).unwrap();
        assert_eq!(tree.sections().len(), 1);
        let users = &tree.sections()[0].items[0];
        assert_eq!(users.id, "admin-users");
        assert_eq!(users.children[0].id, "admin-users-invite");
    }

    #[test]
    fn test_flat_unknown_parent_is_config_error() {
        let err = ModuleTree::from_flat(vec![flat("a", None), flat("b", Some("missing"))])
            .unwrap_err();
        assert!(matches!(err, AccessError::Config(ref msg) if msg.contains("missing")));
    }

    #[test]
    fn test_flat_cycle_is_config_error() {
        let err = ModuleTree::from_flat(vec![
            flat("root", None),
            flat("x", Some("y")),
            flat("y", Some("x")),
        ])
        .unwrap_err();
        assert!(matches!(err, AccessError::Config(ref msg) if msg.contains("x, y")));
    }

    #[test]
    fn test_flat_duplicate_id_is_config_error() {
        let err = ModuleTree::from_flat(vec![flat("a", None), flat("a", None)]).unwrap_err();
        assert!(matches!(err, AccessError::Config(_)));
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        assert!(matches!(
            ModuleTree::from_yaml("sections: 12"),
            Err(AccessError::Config(_))
        ));
    }
}
