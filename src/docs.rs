use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::nav::{NavItem, NavSection, RouteNode};
use crate::routes;
use crate::routes::health::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::auth::logout,
        routes::permissions::my_permissions,
        routes::permissions::list_catalogue,
        routes::permissions::toggle_permission,
        routes::permissions::list_users,
        routes::permissions::set_role,
        routes::permissions::list_grants,
        routes::permissions::grant_permission,
        routes::permissions::revoke_permission,
        routes::permissions::recent_activity,
        routes::nav::nav_tree,
        routes::nav::route_tree,
        routes::health::health,
    ),
    components(
        schemas(
            models::user::User,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::RegisterRequest,
            models::user::SetRoleRequest,
            models::permission::Permission,
            models::permission::PermissionGrant,
            models::permission::GrantPermissionRequest,
            models::permission::TogglePermissionRequest,
            models::activity::ActivityEntry,
            NavSection,
            NavItem,
            RouteNode,
            HealthResponse
        )
    ),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Permissions", description = "Catalogue and grant administration"),
        (name = "Navigation", description = "Filtered navigation and route trees"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI document: per-handler `#[utoipa::path]` annotations
/// provide the paths; this adds the bearer scheme, a global security
/// requirement, and a `servers` entry for the running port.
pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
    let mut doc = serde_json::to_value(ApiDoc::openapi())?;

    ensure_security_components(&mut doc);
    ensure_servers(&mut doc, port);

    Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .persist_authorization(true);

    let doc_json = Arc::new(serde_json::to_value(&doc).expect("OpenAPI serialization must succeed"));

    let json_route = {
        let doc_json = Arc::clone(&doc_json);
        get(move || {
            let doc_json = Arc::clone(&doc_json);
            async move { Json((*doc_json).clone()) }
        })
    };

    Router::new()
        .route("/api-docs/openapi.json", json_route)
        .merge(SwaggerUi::new("/docs").config(swagger_config))
}

fn ensure_security_components(doc: &mut Value) {
    let components = doc
        .as_object_mut()
        .expect("OpenAPI root must be an object")
        .entry("components")
        .or_insert_with(|| json!({}));

    if let Some(components) = components.as_object_mut() {
        let schemes = components
            .entry("securitySchemes")
            .or_insert_with(|| json!({}));
        if let Some(schemes) = schemes.as_object_mut() {
            schemes.entry("bearerAuth").or_insert_with(|| {
                json!({
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT"
                })
            });
        }
    }

    doc.as_object_mut()
        .expect("OpenAPI root must be an object")
        .entry("security")
        .or_insert_with(|| json!([{ "bearerAuth": [] }]));
}

fn ensure_servers(doc: &mut Value, port: u16) {
    doc.as_object_mut()
        .expect("OpenAPI root must be an object")
        .entry("servers")
        .or_insert_with(|| json!([{ "url": format!("http://localhost:{port}") }]));
}
