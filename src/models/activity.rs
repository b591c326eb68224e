use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// A row of the activity-log projection, as served to admin screens.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub event_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    pub severity: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbActivityEntry {
    pub id: String,
    pub event_name: String,
    pub description: String,
    pub actor_id: Option<String>,
    pub subject_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub severity: String,
}

impl TryFrom<DbActivityEntry> for ActivityEntry {
    type Error = AppError;

    fn try_from(value: DbActivityEntry) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&value.id)
            .map_err(|err| AppError::internal(format!("invalid activity id in database: {err}")))?;

        Ok(ActivityEntry {
            id,
            event_name: value.event_name,
            description: value.description,
            actor_id: value.actor_id.and_then(|s| Uuid::parse_str(&s).ok()),
            subject_id: value.subject_id.and_then(|s| Uuid::parse_str(&s).ok()),
            occurred_at: value.occurred_at,
            severity: value.severity,
        })
    }
}
