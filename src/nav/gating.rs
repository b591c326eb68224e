use crate::authz::{slugs, Requirement};

/// Declarative gating rules: node key -> required permission expression.
/// Keys with one segment gate top-level items, `parent/child` keys gate
/// their children. Keys absent from the table are always kept.
#[derive(Debug, Clone, Copy)]
pub struct GatingTable {
    entries: &'static [(&'static str, Requirement)],
}

impl GatingTable {
    pub const fn new(entries: &'static [(&'static str, Requirement)]) -> Self {
        Self { entries }
    }

    pub fn requirement(&self, key: &str) -> Option<&Requirement> {
        self.entries
            .iter()
            .find(|(entry_key, _)| *entry_key == key)
            .map(|(_, requirement)| requirement)
    }
}

/// The single table both the nav filter and the route filter consume.
pub const GATING: GatingTable = GatingTable::new(&[
    // Orders
    ("orders", Requirement::Single(slugs::ORDER_LIST)),
    ("orders/list", Requirement::Single(slugs::ORDER_LIST)),
    ("orders/new", Requirement::Single(slugs::ORDER_CREATE)),
    // Plans
    ("plans", Requirement::Single(slugs::PLAN_LIST)),
    ("plans/list", Requirement::Single(slugs::PLAN_LIST)),
    ("plans/new", Requirement::Single(slugs::PLAN_CREATE)),
    // Products: visible when any product-adjacent capability is granted
    (
        "products",
        Requirement::AnyOf(&[slugs::PRODUCT_LIST, slugs::ADDON_LIST, slugs::PRODUCT_STOCK]),
    ),
    ("products/list", Requirement::Single(slugs::PRODUCT_LIST)),
    ("products/new", Requirement::Single(slugs::PRODUCT_CREATE)),
    ("products/stock", Requirement::Single(slugs::PRODUCT_STOCK)),
    ("products/addons", Requirement::Single(slugs::ADDON_LIST)),
    // Customers
    ("customers", Requirement::Single(slugs::CUSTOMER_LIST)),
    ("customers/list", Requirement::Single(slugs::CUSTOMER_LIST)),
    ("customers/new", Requirement::Single(slugs::CUSTOMER_CREATE)),
    // Staff
    ("staff", Requirement::Single(slugs::STAFF_LIST)),
    ("staff/list", Requirement::Single(slugs::STAFF_LIST)),
    ("staff/new", Requirement::Single(slugs::STAFF_CREATE)),
    // Permission administration
    ("permissions", Requirement::Single(slugs::PERMISSION_LIST)),
    // Reports
    (
        "reports",
        Requirement::AnyOf(&[slugs::REPORT_VIEW, slugs::REPORT_EXPORT]),
    ),
    ("reports/sales", Requirement::Single(slugs::REPORT_VIEW)),
    ("reports/export", Requirement::Single(slugs::REPORT_EXPORT)),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_hits_and_misses() {
        assert!(GATING.requirement("orders").is_some());
        assert!(GATING.requirement("products/new").is_some());
        assert!(GATING.requirement("overview").is_none());
        assert!(GATING.requirement("orders/archive").is_none());
    }

    #[test]
    fn every_gated_slug_is_in_the_catalogue() {
        for (key, requirement) in GATING.entries {
            let slugs: Vec<&str> = match requirement {
                Requirement::Single(slug) => vec![*slug],
                Requirement::AnyOf(list) => list.to_vec(),
            };
            for slug in slugs {
                assert!(
                    crate::authz::CATALOGUE.iter().any(|e| e.slug == slug),
                    "gating key '{key}' references slug '{slug}' missing from the catalogue"
                );
            }
        }
    }
}
