use sqlx::SqlitePool;
use uuid::Uuid;

use super::slugs;
use crate::errors::AppError;
use crate::utils::utc_now;

/// One build-time catalogue entry. The slug is the identity; the label is
/// what admin screens display next to a grant checkbox.
#[derive(Debug, Clone, Copy)]
pub struct CatalogueEntry {
    pub slug: &'static str,
    pub label: &'static str,
}

const fn entry(slug: &'static str, label: &'static str) -> CatalogueEntry {
    CatalogueEntry { slug, label }
}

/// The fixed permission taxonomy. Grants and gating rules may only reference
/// slugs listed here; [`sync_catalogue`] mirrors the list into the database.
pub const CATALOGUE: &[CatalogueEntry] = &[
    entry(slugs::ORDER_LIST, "View orders"),
    entry(slugs::ORDER_CREATE, "Create orders"),
    entry(slugs::ORDER_UPDATE, "Edit orders"),
    entry(slugs::ORDER_CANCEL, "Cancel orders"),
    entry(slugs::ORDER_EXPORT, "Export orders"),
    entry(slugs::PLAN_LIST, "View plans"),
    entry(slugs::PLAN_CREATE, "Create plans"),
    entry(slugs::PLAN_UPDATE, "Edit plans"),
    entry(slugs::PLAN_PAUSE, "Pause plans"),
    entry(slugs::PRODUCT_LIST, "View products"),
    entry(slugs::PRODUCT_CREATE, "Create products"),
    entry(slugs::PRODUCT_UPDATE, "Edit products"),
    entry(slugs::PRODUCT_STOCK, "Manage product stock"),
    entry(slugs::ADDON_LIST, "View add-ons"),
    entry(slugs::ADDON_CREATE, "Create add-ons"),
    entry(slugs::CUSTOMER_LIST, "View customers"),
    entry(slugs::CUSTOMER_CREATE, "Create customers"),
    entry(slugs::CUSTOMER_UPDATE, "Edit customers"),
    entry(slugs::STAFF_LIST, "View staff"),
    entry(slugs::STAFF_CREATE, "Create staff"),
    entry(slugs::STAFF_UPDATE, "Edit staff"),
    entry(slugs::PERMISSION_LIST, "View permission grants"),
    entry(slugs::PERMISSION_MANAGE, "Manage permission grants"),
    entry(slugs::REPORT_VIEW, "View reports"),
    entry(slugs::REPORT_EXPORT, "Export reports"),
];

/// Mirror the build-time catalogue into the `permissions` table so grants can
/// reference it by id. Existing rows keep their `enabled` flag; only missing
/// slugs are inserted. Runs at application startup.
pub async fn sync_catalogue(pool: &SqlitePool) -> Result<(), AppError> {
    for entry in CATALOGUE {
        let existing: Option<String> = sqlx::query_scalar("SELECT id FROM permissions WHERE slug = ?")
            .bind(entry.slug)
            .fetch_optional(pool)
            .await?;

        if existing.is_some() {
            continue;
        }

        let now = utc_now();
        sqlx::query(
            "INSERT INTO permissions (id, slug, label, enabled, created_at, updated_at) VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(entry.slug)
        .bind(entry.label)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        tracing::debug!(slug = entry.slug, "catalogue entry inserted");
    }

    Ok(())
}
