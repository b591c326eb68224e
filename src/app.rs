use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{sync_catalogue, SqliteSessionSource};
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::nav::{nav_sections, route_nodes, validate_gating_depth};
use crate::routes::{auth, health, nav, permissions};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub event_bus: EventBus,
    pub sessions: Arc<SqliteSessionSource>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        let sessions = Arc::new(SqliteSessionSource::new(pool.clone()));
        Self {
            pool,
            jwt: Arc::new(jwt),
            event_bus,
            sessions,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    // Static trees must stay within the nesting the gating table addresses.
    let sections = nav_sections();
    for section in &sections {
        validate_gating_depth(&section.items)?;
    }
    validate_gating_depth(&route_nodes())?;

    sync_catalogue(&pool).await?;

    let jwt_config = JwtConfig::from_env()?;
    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_activity_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let router = Router::new()
        .nest("/auth", auth_routes)
        .route("/permissions", get(permissions::my_permissions))
        .route("/nav", get(nav::nav_tree))
        .route("/routes", get(nav::route_tree))
        .nest("/admin", permissions::admin_routes())
        .route("/health", get(health::health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
