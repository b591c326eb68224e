use crate::authz::Session;

use super::gating::{GatingTable, GATING};
use super::tree::{GateNode, NavSection, RouteNode};

/// Derive the navigation tree visible to `session`. Pure and
/// order-preserving; the static source tree is never mutated. Sessions that
/// bypass filtering get the full tree back.
pub fn filter_nav(sections: &[NavSection], session: &Session) -> Vec<NavSection> {
    if session.bypasses_filtering() {
        return sections.to_vec();
    }

    sections
        .iter()
        .map(|section| NavSection {
            subheader: section.subheader.clone(),
            items: filter_level(&section.items, None, session, &GATING),
        })
        .collect()
}

/// Derive the router configuration visible to `session`. Same algorithm and
/// gating table as [`filter_nav`], keyed by path segments.
pub fn filter_routes(routes: &[RouteNode], session: &Session) -> Vec<RouteNode> {
    if session.bypasses_filtering() {
        return routes.to_vec();
    }

    filter_level(routes, None, session, &GATING)
}

/// One filtering pass over a sibling list. A node whose own rule fails is
/// dropped with its subtree. A parent node survives when at least one child
/// survives or when it carries no rule at all; ungated leaves always
/// survive. Relative order of survivors is preserved.
fn filter_level<T: GateNode>(
    nodes: &[T],
    prefix: Option<&str>,
    session: &Session,
    table: &GatingTable,
) -> Vec<T> {
    nodes
        .iter()
        .filter_map(|node| {
            let key = match prefix {
                Some(parent) => format!("{}/{}", parent, node.gate_key()),
                None => node.gate_key().to_string(),
            };

            let rule = table.requirement(&key);
            if let Some(requirement) = rule {
                if !session.allows(requirement) {
                    return None;
                }
            }

            if node.child_nodes().is_empty() {
                return Some(node.clone());
            }

            let children = filter_level(node.child_nodes(), Some(&key), session, table);
            if !children.is_empty() || rule.is_none() {
                Some(node.with_child_nodes(children))
            } else {
                None
            }
        })
        .collect()
}
