//! Navigation and route filtering
//!
//! The sidebar tree and the router tree are static constants that share one
//! declarative gating table keyed by stable node keys ("products",
//! "products/new"). A single generic filter walks either tree against a
//! [`crate::authz::Session`] and returns a fresh, order-preserving copy
//! containing only the nodes the session may see.

mod data;
mod filter;
mod gating;
mod tree;

pub use data::{nav_sections, route_nodes};
pub use filter::{filter_nav, filter_routes};
pub use gating::GATING;
pub use tree::{validate_gating_depth, GateNode, NavItem, NavSection, RouteNode};
