use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;

/// Gating rules address at most two nested levels (item -> child).
const MAX_GATED_DEPTH: usize = 2;

/// A sidebar group: a subheader plus its items. Sections themselves carry no
/// gating rule; they are kept as-is and only their items are filtered.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NavSection {
    pub subheader: String,
    pub items: Vec<NavItem>,
}

/// A sidebar entry. `key` is the stable slug the gating table is keyed by;
/// it matches the corresponding router path segment so nav and route trees
/// share one table.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NavItem {
    pub key: String,
    pub title: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<Object>)]
    pub children: Vec<NavItem>,
}

impl NavItem {
    pub fn new(key: &str, title: &str, path: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            path: path.to_string(),
            icon: None,
            children: Vec::new(),
        }
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn children(mut self, children: Vec<NavItem>) -> Self {
        self.children = children;
        self
    }
}

/// A router configuration node, keyed by its path segment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RouteNode {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<Object>)]
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            children: Vec::new(),
        }
    }

    pub fn children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = children;
        self
    }
}

/// The shared shape the generic filter operates on. Nav items key by their
/// explicit `key`, route nodes by their path segment.
pub trait GateNode: Clone {
    fn gate_key(&self) -> &str;
    fn child_nodes(&self) -> &[Self];
    fn with_child_nodes(&self, children: Vec<Self>) -> Self;
}

impl GateNode for NavItem {
    fn gate_key(&self) -> &str {
        &self.key
    }

    fn child_nodes(&self) -> &[Self] {
        &self.children
    }

    fn with_child_nodes(&self, children: Vec<Self>) -> Self {
        let mut item = self.clone();
        item.children = children;
        item
    }
}

impl GateNode for RouteNode {
    fn gate_key(&self) -> &str {
        &self.path
    }

    fn child_nodes(&self) -> &[Self] {
        &self.children
    }

    fn with_child_nodes(&self, children: Vec<Self>) -> Self {
        let mut node = self.clone();
        node.children = children;
        node
    }
}

/// Reject trees nested deeper than the gating table can address. Runs once
/// at startup; the filter itself stays infallible.
pub fn validate_gating_depth<T: GateNode>(nodes: &[T]) -> Result<(), AppError> {
    fn walk<T: GateNode>(nodes: &[T], depth: usize, trail: &str) -> Result<(), AppError> {
        for node in nodes {
            let key = if trail.is_empty() {
                node.gate_key().to_string()
            } else {
                format!("{}/{}", trail, node.gate_key())
            };
            if depth == MAX_GATED_DEPTH && !node.child_nodes().is_empty() {
                return Err(AppError::configuration(format!(
                    "node '{key}' nests deeper than the {MAX_GATED_DEPTH} gated levels"
                )));
            }
            walk(node.child_nodes(), depth + 1, &key)?;
        }
        Ok(())
    }

    walk(nodes, 1, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_levels_are_accepted() {
        let nodes = vec![NavItem::new("orders", "Orders", "/orders")
            .children(vec![NavItem::new("list", "List", "/orders/list")])];

        assert!(validate_gating_depth(&nodes).is_ok());
    }

    #[test]
    fn third_level_is_a_configuration_error() {
        let nodes = vec![NavItem::new("orders", "Orders", "/orders").children(vec![
            NavItem::new("list", "List", "/orders/list")
                .children(vec![NavItem::new("archived", "Archived", "/orders/list/archived")]),
        ])];

        let err = validate_gating_depth(&nodes).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
