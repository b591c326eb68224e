//! Permission catalogue and grant administration
//!
//! `GET /permissions` is the session-scoped endpoint the SPA builds its
//! permission set from. Everything under `/admin` manages the catalogue and
//! per-user grants; all grant mutations land in the activity log with
//! Critical severity.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{slugs, Requirement, Session, SessionSource};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::activity::{ActivityEntry, DbActivityEntry};
use crate::models::permission::{
    DbPermission, GrantPermissionRequest, Permission, PermissionGrant, TogglePermissionRequest,
};
use crate::models::user::{DbUser, SetRoleRequest, User};
use crate::routes::auth::fetch_user_by_id;
use crate::utils::utc_now;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/permissions", get(list_catalogue))
        .route("/permissions/:slug", axum::routing::put(toggle_permission))
        .route("/users", get(list_users))
        .route("/users/:user_id/role", axum::routing::put(set_role))
        .route("/users/:user_id/permissions", get(list_grants).post(grant_permission))
        .route("/users/:user_id/permissions/:slug", axum::routing::delete(revoke_permission))
        .route("/activity", get(recent_activity))
}

/// Inline guard shared by the admin handlers: evaluates the same predicate
/// as the tree filter, against an explicit requirement.
fn require(session: &Session, requirement: &Requirement) -> Result<(), AppError> {
    if session.allows(requirement) {
        return Ok(());
    }
    Err(AppError::forbidden("missing permission"))
}

const CAN_VIEW: Requirement = Requirement::Single(slugs::PERMISSION_LIST);
const CAN_MANAGE: Requirement = Requirement::Single(slugs::PERMISSION_MANAGE);

// =============================================================================
// SESSION-SCOPED CATALOGUE
// =============================================================================

/// The enabled catalogue entries granted to the current session. Elevated
/// roles see the whole enabled catalogue.
#[utoipa::path(
    get,
    path = "/permissions",
    tag = "Permissions",
    responses((status = 200, description = "Permissions granted to the session", body = Vec<Permission>)),
    security(("bearerAuth" = []))
)]
pub async fn my_permissions(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Permission>>> {
    let session = state.sessions.session_for(auth.user_id).await?;

    let rows = if session.bypasses_filtering() {
        sqlx::query_as::<_, DbPermission>(
            "SELECT id, slug, label, enabled, created_at, updated_at FROM permissions WHERE enabled = 1 ORDER BY slug",
        )
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, DbPermission>(
            "SELECT p.id, p.slug, p.label, p.enabled, p.created_at, p.updated_at FROM permissions p \
             JOIN user_permissions up ON up.permission_id = p.id \
             WHERE up.user_id = ? AND p.enabled = 1 ORDER BY p.slug",
        )
        .bind(auth.user_id.to_string())
        .fetch_all(&state.pool)
        .await?
    };

    rows.into_iter()
        .map(Permission::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

// =============================================================================
// ADMIN: CATALOGUE AND USERS
// =============================================================================

/// Full catalogue including disabled entries.
#[utoipa::path(
    get,
    path = "/admin/permissions",
    tag = "Permissions",
    responses((status = 200, description = "Full permission catalogue", body = Vec<Permission>)),
    security(("bearerAuth" = []))
)]
pub async fn list_catalogue(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Permission>>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_VIEW)?;

    let rows = sqlx::query_as::<_, DbPermission>(
        "SELECT id, slug, label, enabled, created_at, updated_at FROM permissions ORDER BY slug",
    )
    .fetch_all(&state.pool)
    .await?;

    rows.into_iter()
        .map(Permission::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Enable or disable a catalogue entry. Disabling hides the capability from
/// every staff session that holds a grant for it.
#[utoipa::path(
    put,
    path = "/admin/permissions/{slug}",
    tag = "Permissions",
    params(("slug" = String, Path, description = "Permission slug")),
    request_body = TogglePermissionRequest,
    responses(
        (status = 200, description = "Catalogue entry updated", body = Permission),
        (status = 422, description = "Slug not in the catalogue"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn toggle_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(slug): Path<String>,
    Json(req): Json<TogglePermissionRequest>,
) -> AppResult<Json<Permission>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_MANAGE)?;

    let old = fetch_permission_by_slug(&state, &slug).await?;

    sqlx::query("UPDATE permissions SET enabled = ?, updated_at = ? WHERE id = ?")
        .bind(req.enabled)
        .bind(utc_now())
        .bind(old.id.to_string())
        .execute(&state.pool)
        .await?;

    let permission = fetch_permission_by_slug(&state, &slug).await?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(auth.user_id),
        &permission,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(permission))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Permissions",
    responses((status = 200, description = "Users with their roles", body = Vec<User>)),
    security(("bearerAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<User>>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_VIEW)?;

    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, role, created_at, updated_at, deleted_at FROM users \
         WHERE deleted_at IS NULL ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;

    rows.into_iter()
        .map(User::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Change a user's role.
#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/role",
    tag = "Permissions",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = User),
        (status = 400, description = "Unknown role"),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<User>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_MANAGE)?;

    let role = crate::authz::Role::parse(&req.role)
        .ok_or_else(|| AppError::bad_request(format!("unknown role '{}'", req.role)))?;

    let old: User = fetch_user_by_id(&state.pool, user_id).await?.try_into()?;

    sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(utc_now())
        .bind(user_id.to_string())
        .execute(&state.pool)
        .await?;

    let user: User = fetch_user_by_id(&state.pool, user_id).await?.try_into()?;

    log_activity_with_context(
        &state.event_bus,
        "role_changed",
        Some(auth.user_id),
        &user,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(user))
}

// =============================================================================
// ADMIN: GRANTS
// =============================================================================

#[utoipa::path(
    get,
    path = "/admin/users/{user_id}/permissions",
    tag = "Permissions",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Permissions granted to the user", body = Vec<Permission>)),
    security(("bearerAuth" = []))
)]
pub async fn list_grants(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Permission>>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_VIEW)?;

    // 404 on unknown users rather than an empty grant list
    fetch_user_by_id(&state.pool, user_id).await?;

    let rows = sqlx::query_as::<_, DbPermission>(
        "SELECT p.id, p.slug, p.label, p.enabled, p.created_at, p.updated_at FROM permissions p \
         JOIN user_permissions up ON up.permission_id = p.id \
         WHERE up.user_id = ? ORDER BY p.slug",
    )
    .bind(user_id.to_string())
    .fetch_all(&state.pool)
    .await?;

    rows.into_iter()
        .map(Permission::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Grant a catalogue permission to a user.
#[utoipa::path(
    post,
    path = "/admin/users/{user_id}/permissions",
    tag = "Permissions",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 201, description = "Permission granted", body = PermissionGrant),
        (status = 404, description = "User not found"),
        (status = 409, description = "Already granted"),
        (status = 422, description = "Slug not in the catalogue"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(req): Json<GrantPermissionRequest>,
) -> AppResult<(StatusCode, Json<PermissionGrant>)> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_MANAGE)?;

    fetch_user_by_id(&state.pool, user_id).await?;

    let permission = fetch_permission_by_slug(&state, &req.slug).await?;

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM user_permissions WHERE user_id = ? AND permission_id = ?",
    )
    .bind(user_id.to_string())
    .bind(permission.id.to_string())
    .fetch_optional(&state.pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::conflict(format!("'{}' already granted", permission.slug)));
    }

    let now = utc_now();
    sqlx::query("INSERT INTO user_permissions (user_id, permission_id, created_at) VALUES (?, ?, ?)")
        .bind(user_id.to_string())
        .bind(permission.id.to_string())
        .bind(now)
        .execute(&state.pool)
        .await?;

    let grant = PermissionGrant {
        user_id,
        permission_id: permission.id,
        slug: permission.slug,
        created_at: now,
    };

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &grant,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(grant)))
}

/// Revoke a granted permission.
#[utoipa::path(
    delete,
    path = "/admin/users/{user_id}/permissions/{slug}",
    tag = "Permissions",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("slug" = String, Path, description = "Permission slug"),
    ),
    responses(
        (status = 204, description = "Permission revoked"),
        (status = 404, description = "Grant not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((user_id, slug)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_MANAGE)?;

    let permission = fetch_permission_by_slug(&state, &slug).await?;

    let result = sqlx::query("DELETE FROM user_permissions WHERE user_id = ? AND permission_id = ?")
        .bind(user_id.to_string())
        .bind(permission.id.to_string())
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("grant not found"));
    }

    let grant = PermissionGrant {
        user_id,
        permission_id: permission.id,
        slug: permission.slug,
        created_at: utc_now(),
    };

    log_activity_with_context(
        &state.event_bus,
        "revoked",
        Some(auth.user_id),
        &grant,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// ADMIN: ACTIVITY
// =============================================================================

#[utoipa::path(
    get,
    path = "/admin/activity",
    tag = "Permissions",
    responses((status = 200, description = "Recent activity entries", body = Vec<ActivityEntry>)),
    security(("bearerAuth" = []))
)]
pub async fn recent_activity(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<ActivityEntry>>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    require(&session, &CAN_VIEW)?;

    let rows = sqlx::query_as::<_, DbActivityEntry>(
        "SELECT id, event_name, description, actor_id, subject_id, occurred_at, severity FROM activity_log \
         ORDER BY occurred_at DESC LIMIT 50",
    )
    .fetch_all(&state.pool)
    .await?;

    rows.into_iter()
        .map(ActivityEntry::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

async fn fetch_permission_by_slug(state: &AppState, slug: &str) -> AppResult<Permission> {
    sqlx::query_as::<_, DbPermission>(
        "SELECT id, slug, label, enabled, created_at, updated_at FROM permissions WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::unknown_permission(slug))?
    .try_into()
}
