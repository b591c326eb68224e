use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::SessionSource;
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::nav::{filter_nav, filter_routes, nav_sections, route_nodes, NavSection, RouteNode};

/// The sidebar tree the session may see. Recomputed per request so a grant
/// or role change takes effect on the next fetch.
#[utoipa::path(
    get,
    path = "/nav",
    tag = "Navigation",
    responses((status = 200, description = "Filtered navigation tree", body = Vec<NavSection>)),
    security(("bearerAuth" = []))
)]
pub async fn nav_tree(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<NavSection>>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    Ok(Json(filter_nav(&nav_sections(), &session)))
}

/// The router configuration the session may mount.
#[utoipa::path(
    get,
    path = "/routes",
    tag = "Navigation",
    responses((status = 200, description = "Filtered route configuration", body = Vec<RouteNode>)),
    security(("bearerAuth" = []))
)]
pub async fn route_tree(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<RouteNode>>> {
    let session = state.sessions.session_for(auth.user_id).await?;
    Ok(Json(filter_routes(&route_nodes(), &session)))
}
