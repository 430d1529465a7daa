//! Default access derived from the navigation tree
//!
//! The resolver flattens the module tree once at construction and then answers
//! `resolve` calls without I/O. A module is open to a role when its effective
//! required-role list is absent or empty, names the role, or the role is admin.
//! Items that declare no list inherit the list of their nearest ancestor.

use std::collections::{BTreeMap, HashMap};

use crate::models::{ModuleTree, NavItem, ResolvedPermission, PermissionTable, Role, ADMIN_ROLE};
use crate::utils::{validation::validate_module_id, AccessError, AccessResult};

#[derive(Debug, Clone)]
struct ModuleNode {
    id: String,
    label: String,
    parent_id: Option<String>,
    /// Effective list after inheritance
    required_roles: Option<Vec<String>>,
}

/// Pure resolver from module tree + roles to a default permission table
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    nodes: Vec<ModuleNode>,
    index: HashMap<String, usize>,
    logout_module_id: String,
}

impl FallbackResolver {
    /// Flatten and validate the tree
    ///
    /// The logout module is left out: its access is fixed by the engine rather
    /// than by the matrix. A logout node with children is a configuration error.
    pub fn new(tree: &ModuleTree, logout_module_id: impl Into<String>) -> AccessResult<Self> {
        let mut resolver = Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            logout_module_id: logout_module_id.into(),
        };

        for section in tree.sections() {
            if section.id == resolver.logout_module_id {
                resolver.ensure_logout_is_leaf(!section.items.is_empty())?;
                continue;
            }
            let required = section.required_roles.clone();
            resolver.push(&section.id, section.label(), None, required.clone())?;
            for item in &section.items {
                resolver.walk(item, &section.id, required.as_ref())?;
            }
        }

        Ok(resolver)
    }

    fn walk(
        &mut self,
        item: &NavItem,
        parent_id: &str,
        inherited: Option<&Vec<String>>,
    ) -> AccessResult<()> {
        if item.id == self.logout_module_id {
            return self.ensure_logout_is_leaf(!item.children.is_empty());
        }

        let effective = item.required_roles.clone().or_else(|| inherited.cloned());
        self.push(
            &item.id,
            &item.label,
            Some(parent_id.to_string()),
            effective.clone(),
        )?;

        for child in &item.children {
            self.walk(child, &item.id, effective.as_ref())?;
        }
        Ok(())
    }

    fn push(
        &mut self,
        id: &str,
        label: &str,
        parent_id: Option<String>,
        required_roles: Option<Vec<String>>,
    ) -> AccessResult<()> {
        if !validate_module_id(id) {
            return Err(AccessError::Config(format!("invalid module id '{}'", id)));
        }
        if self.index.contains_key(id) {
            return Err(AccessError::Config(format!("duplicate module id '{}'", id)));
        }

        self.index.insert(id.to_string(), self.nodes.len());
        self.nodes.push(ModuleNode {
            id: id.to_string(),
            label: label.to_string(),
            parent_id,
            required_roles,
        });
        Ok(())
    }

    fn ensure_logout_is_leaf(&self, has_children: bool) -> AccessResult<()> {
        if has_children {
            return Err(AccessError::Config(format!(
                "logout module '{}' cannot have children",
                self.logout_module_id
            )));
        }
        Ok(())
    }

    pub fn logout_module_id(&self) -> &str {
        &self.logout_module_id
    }

    /// Number of modules in the editable matrix
    pub fn module_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.index.contains_key(module_id)
    }

    /// Default table for every module and every role
    pub fn resolve(&self, roles: &[Role]) -> PermissionTable {
        self.nodes.iter().map(|node| resolve_node(node, roles)).collect()
    }

    /// Default entry for a single module, `None` if the tree does not know it
    pub fn resolve_module(&self, module_id: &str, roles: &[Role]) -> Option<ResolvedPermission> {
        self.index
            .get(module_id)
            .map(|&i| resolve_node(&self.nodes[i], roles))
    }
}

fn resolve_node(node: &ModuleNode, roles: &[Role]) -> ResolvedPermission {
    let mut role_access: BTreeMap<String, bool> = roles
        .iter()
        .map(|role| {
            let granted = grants(node.required_roles.as_deref(), &role.name);
            (role.name.clone(), granted)
        })
        .collect();
    role_access.insert(ADMIN_ROLE.to_string(), true);

    ResolvedPermission {
        module_id: node.id.clone(),
        label: node.label.clone(),
        parent_id: node.parent_id.clone(),
        role_access,
    }
}

fn grants(required: Option<&[String]>, role_name: &str) -> bool {
    if role_name == ADMIN_ROLE {
        return true;
    }
    match required {
        None => true,
        Some(list) => list.is_empty() || list.iter().any(|r| r == role_name),
    }
}
