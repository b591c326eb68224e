use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::session::Session;
use crate::errors::AppError;

/// Source of assembled sessions, kept behind a trait so handlers and the CLI
/// share one implementation and tests can substitute a canned one.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn session_for(&self, user_id: Uuid) -> Result<Session, AppError>;
}

/// Assembles sessions from the `users` and `user_permissions` tables.
#[derive(Debug, Clone)]
pub struct SqliteSessionSource {
    pool: SqlitePool,
}

impl SqliteSessionSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionSource for SqliteSessionSource {
    async fn session_for(&self, user_id: Uuid) -> Result<Session, AppError> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM users WHERE id = ? AND deleted_at IS NULL")
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        let role = role.ok_or_else(|| AppError::unauthorized("user not found"))?;
        let session = Session::new(user_id).with_roles(std::iter::once(role));

        // Elevated sessions never consult grants.
        if session.bypasses_filtering() {
            return Ok(session);
        }

        // Fail closed: a failed grant lookup yields an empty permission set,
        // which hides every gated item. Not retried.
        let grants: Vec<String> = match sqlx::query_scalar(
            "SELECT p.slug FROM permissions p \
             JOIN user_permissions up ON up.permission_id = p.id \
             WHERE up.user_id = ? AND p.enabled = 1",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        {
            Ok(slugs) => slugs,
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "grant lookup failed; session gets empty permission set");
                Vec::new()
            }
        };

        Ok(session.with_permissions(grants))
    }
}
