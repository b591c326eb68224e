//! Authorization module - session assembly and permission gating
//!
//! The permission model is deliberately flat:
//! - a fixed catalogue of permission slugs, mirrored into the database
//! - per-user grants (no role->permission indirection)
//! - elevated roles (owner/admin) bypass every gate
//!
//! Filtering of navigation and route trees lives in [`crate::nav`] and
//! consumes the [`Session`] built here.

mod catalogue;
mod session;
mod store;

pub use catalogue::{sync_catalogue, CatalogueEntry, CATALOGUE};
pub use session::{Requirement, Role, Session};
pub use store::{SessionSource, SqliteSessionSource};

/// Well-known role names. Only `staff` is subject to permission filtering;
/// `owner` and `admin` bypass it. Anything else is treated as restricted.
pub mod roles {
    pub const OWNER: &str = "owner";
    pub const ADMIN: &str = "admin";
    pub const STAFF: &str = "staff";
}

/// Well-known permission slugs, one block per backoffice area.
pub mod slugs {
    // Orders
    pub const ORDER_LIST: &str = "order.list";
    pub const ORDER_CREATE: &str = "order.create";
    pub const ORDER_UPDATE: &str = "order.update";
    pub const ORDER_CANCEL: &str = "order.cancel";
    pub const ORDER_EXPORT: &str = "order.export";

    // Plans
    pub const PLAN_LIST: &str = "plan.list";
    pub const PLAN_CREATE: &str = "plan.create";
    pub const PLAN_UPDATE: &str = "plan.update";
    pub const PLAN_PAUSE: &str = "plan.pause";

    // Products
    pub const PRODUCT_LIST: &str = "product.list";
    pub const PRODUCT_CREATE: &str = "product.create";
    pub const PRODUCT_UPDATE: &str = "product.update";
    pub const PRODUCT_STOCK: &str = "product.stock";
    pub const ADDON_LIST: &str = "addon.list";
    pub const ADDON_CREATE: &str = "addon.create";

    // Customers
    pub const CUSTOMER_LIST: &str = "customer.list";
    pub const CUSTOMER_CREATE: &str = "customer.create";
    pub const CUSTOMER_UPDATE: &str = "customer.update";

    // Staff
    pub const STAFF_LIST: &str = "staff.list";
    pub const STAFF_CREATE: &str = "staff.create";
    pub const STAFF_UPDATE: &str = "staff.update";

    // Permission administration
    pub const PERMISSION_LIST: &str = "permission.list";
    pub const PERMISSION_MANAGE: &str = "permission.manage";

    // Reports
    pub const REPORT_VIEW: &str = "report.view";
    pub const REPORT_EXPORT: &str = "report.export";
}
