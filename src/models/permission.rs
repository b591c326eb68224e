use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{Loggable, Severity};

/// A catalogue entry as served to clients. The SPA keys its permission set
/// off `slug`; disabled entries never reach non-admin responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Permission {
    fn entity_type() -> &'static str { "permission" }
    fn subject_id(&self) -> Uuid { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPermission {
    pub id: String,
    pub slug: String,
    pub label: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbPermission> for Permission {
    type Error = AppError;

    fn try_from(value: DbPermission) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("invalid permission id in database: {err}")))?;

        Ok(Permission {
            id,
            slug: value.slug,
            label: value.label,
            enabled: value.enabled,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// A grant of one catalogue permission to one user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionGrant {
    pub user_id: Uuid,
    pub permission_id: Uuid,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for PermissionGrant {
    fn entity_type() -> &'static str { "grant" }
    fn subject_id(&self) -> Uuid { self.user_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantPermissionRequest {
    #[schema(example = "product.list")]
    pub slug: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TogglePermissionRequest {
    pub enabled: bool,
}
