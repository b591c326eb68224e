use super::tree::{NavItem, NavSection, RouteNode};

/// The full sidebar tree. Built fresh on each call; filtering never touches
/// a shared instance.
pub fn nav_sections() -> Vec<NavSection> {
    vec![
        NavSection {
            subheader: "general".to_string(),
            items: vec![
                NavItem::new("overview", "Overview", "/overview").icon("ic_analytics"),
                NavItem::new("orders", "Orders", "/orders").icon("ic_order").children(vec![
                    NavItem::new("list", "List", "/orders/list"),
                    NavItem::new("new", "New Order", "/orders/new"),
                ]),
                NavItem::new("plans", "Plans", "/plans").icon("ic_calendar").children(vec![
                    NavItem::new("list", "List", "/plans/list"),
                    NavItem::new("new", "New Plan", "/plans/new"),
                ]),
            ],
        },
        NavSection {
            subheader: "management".to_string(),
            items: vec![
                NavItem::new("products", "Products", "/products").icon("ic_product").children(vec![
                    NavItem::new("list", "List", "/products/list"),
                    NavItem::new("new", "New Product", "/products/new"),
                    NavItem::new("stock", "Stock", "/products/stock"),
                    NavItem::new("addons", "Add-ons", "/products/addons"),
                ]),
                NavItem::new("customers", "Customers", "/customers").icon("ic_user").children(vec![
                    NavItem::new("list", "List", "/customers/list"),
                    NavItem::new("new", "New Customer", "/customers/new"),
                ]),
                NavItem::new("staff", "Staff", "/staff").icon("ic_lock").children(vec![
                    NavItem::new("list", "List", "/staff/list"),
                    NavItem::new("new", "New Staff", "/staff/new"),
                ]),
                NavItem::new("permissions", "Permissions", "/permissions").icon("ic_key"),
                NavItem::new("reports", "Reports", "/reports").icon("ic_report").children(vec![
                    NavItem::new("sales", "Sales", "/reports/sales"),
                    NavItem::new("export", "Export", "/reports/export"),
                ]),
            ],
        },
    ]
}

/// The router configuration the SPA mounts, mirroring [`nav_sections`] by
/// path segment.
pub fn route_nodes() -> Vec<RouteNode> {
    vec![
        RouteNode::new("overview"),
        RouteNode::new("orders").children(vec![RouteNode::new("list"), RouteNode::new("new")]),
        RouteNode::new("plans").children(vec![RouteNode::new("list"), RouteNode::new("new")]),
        RouteNode::new("products").children(vec![
            RouteNode::new("list"),
            RouteNode::new("new"),
            RouteNode::new("stock"),
            RouteNode::new("addons"),
        ]),
        RouteNode::new("customers").children(vec![RouteNode::new("list"), RouteNode::new("new")]),
        RouteNode::new("staff").children(vec![RouteNode::new("list"), RouteNode::new("new")]),
        RouteNode::new("permissions"),
        RouteNode::new("reports").children(vec![RouteNode::new("sales"), RouteNode::new("export")]),
    ]
}
