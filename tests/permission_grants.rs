use anyhow::Context;
use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt;

use backoffice::create_app;

async fn setup(db_name: &str) -> Result<(Router, SqlitePool, tempfile::TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let db_path = dir.path().join(db_name);
    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    std::env::set_var("JWT_SECRET", "test-secret");
    let app = create_app(pool.clone()).await?;
    Ok((app, pool, dir))
}

async fn register(app: &Router, name: &str, email: &str) -> Result<(String, String)> {
    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"name": name, "email": email, "password": "password123"}).to_string(),
        ))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let auth_res: Value = serde_json::from_slice(&body_bytes)?;
    let token = auth_res.get("token").and_then(|v| v.as_str()).context("missing token")?.to_string();
    let user_id = auth_res
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(|v| v.as_str())
        .context("missing user id")?
        .to_string();
    Ok((token, user_id))
}

async fn grant(app: &Router, token: &str, user_id: &str, slug: &str) -> Result<Response> {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/admin/users/{}/permissions", user_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::from(json!({"slug": slug}).to_string()))?;
    Ok(app.clone().oneshot(req).await?)
}

#[tokio::test]
async fn grant_revoke_flow_over_the_api() -> Result<()> {
    let (app, pool, _dir) = setup("grants.db").await?;

    let (admin_token, admin_id) = register(&app, "The Admin", "admin@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(&admin_id)
        .execute(&pool)
        .await?;

    let (staff_token, staff_id) = register(&app, "Product Clerk", "clerk@example.com").await?;

    // grant product.list
    let resp = grant(&app, &admin_token, &staff_id, "product.list").await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let grant_res: Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(grant_res.get("slug").and_then(|v| v.as_str()), Some("product.list"));

    // duplicate grant conflicts
    let resp = grant(&app, &admin_token, &staff_id, "product.list").await?;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // a slug outside the catalogue is rejected
    let resp = grant(&app, &admin_token, &staff_id, "product.teleport").await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // the staff session now sees products with only the list child
    let req = Request::builder()
        .method("GET")
        .uri("/nav")
        .header("authorization", format!("Bearer {}", staff_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let nav: Value = serde_json::from_slice(&body_bytes)?;
    let products = nav
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s.get("items").unwrap().as_array().unwrap().iter())
        .find(|i| i.get("key").unwrap() == "products")
        .context("products item missing after grant")?;
    let child_keys: Vec<&str> = products
        .get("children")
        .and_then(|c| c.as_array())
        .unwrap()
        .iter()
        .map(|c| c.get("key").unwrap().as_str().unwrap())
        .collect();
    assert_eq!(child_keys, vec!["list"]);

    // the grant list reflects it
    let req = Request::builder()
        .method("GET")
        .uri(format!("/admin/users/{}/permissions", staff_id))
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let grants: Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(grants.as_array().map(|a| a.len()), Some(1));

    // revoke, then revoking again is a 404
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/admin/users/{}/permissions/product.list", staff_id))
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/admin/users/{}/permissions/product.list", staff_id))
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn staff_without_manage_permission_cannot_grant() -> Result<()> {
    let (app, _pool, _dir) = setup("grants_forbidden.db").await?;

    let (staff_token, staff_id) = register(&app, "Plain Staff", "plain@example.com").await?;
    let (_other_token, other_id) = register(&app, "Other Staff", "other@example.com").await?;

    let resp = grant(&app, &staff_token, &other_id, "order.list").await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // nor read the admin views
    for uri in [
        "/admin/permissions".to_string(),
        "/admin/users".to_string(),
        format!("/admin/users/{}/permissions", staff_id),
        "/admin/activity".to_string(),
    ] {
        let req = Request::builder()
            .method("GET")
            .uri(&uri)
            .header("authorization", format!("Bearer {}", staff_token))
            .body(Body::empty())?;
        let resp: Response = app.clone().oneshot(req).await?;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri} should be forbidden");
    }

    Ok(())
}

#[tokio::test]
async fn staff_with_permission_manage_can_administer_grants() -> Result<()> {
    let (app, pool, _dir) = setup("delegated_manage.db").await?;

    let (manager_token, manager_id) = register(&app, "Grant Manager", "manager@example.com").await?;
    let (_clerk_token, clerk_id) = register(&app, "Clerk", "clerk@example.com").await?;

    // delegate permission.manage to a staff user at the storage layer
    let permission_id: String = sqlx::query_scalar("SELECT id FROM permissions WHERE slug = 'permission.manage'")
        .fetch_one(&pool)
        .await?;
    sqlx::query("INSERT INTO user_permissions (user_id, permission_id, created_at) VALUES (?, ?, datetime('now'))")
        .bind(&manager_id)
        .bind(&permission_id)
        .execute(&pool)
        .await?;

    let resp = grant(&app, &manager_token, &clerk_id, "customer.list").await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn disabling_a_catalogue_entry_hides_it_from_granted_sessions() -> Result<()> {
    let (app, pool, _dir) = setup("toggle.db").await?;

    let (admin_token, admin_id) = register(&app, "The Admin", "admin@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(&admin_id)
        .execute(&pool)
        .await?;
    let (staff_token, staff_id) = register(&app, "Clerk", "clerk@example.com").await?;

    let resp = grant(&app, &admin_token, &staff_id, "order.list").await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // disable the catalogue entry over the API
    let req = Request::builder()
        .method("PUT")
        .uri("/admin/permissions/order.list")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"enabled": false}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let permission: Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(permission.get("enabled").and_then(|v| v.as_bool()), Some(false));

    // the grant still exists but the session no longer carries the slug
    let req = Request::builder()
        .method("GET")
        .uri("/nav")
        .header("authorization", format!("Bearer {}", staff_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let nav: Value = serde_json::from_slice(&body_bytes)?;
    let keys: Vec<&str> = nav
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s.get("items").unwrap().as_array().unwrap().iter())
        .map(|i| i.get("key").unwrap().as_str().unwrap())
        .collect();
    assert!(!keys.contains(&"orders"));

    Ok(())
}

#[tokio::test]
async fn role_change_requires_known_role() -> Result<()> {
    let (app, pool, _dir) = setup("role_change.db").await?;

    let (admin_token, admin_id) = register(&app, "The Admin", "admin@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(&admin_id)
        .execute(&pool)
        .await?;
    let (_staff_token, staff_id) = register(&app, "Promotable", "promote@example.com").await?;

    let req = Request::builder()
        .method("PUT")
        .uri(format!("/admin/users/{}/role", staff_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"role": "grand_vizier"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("PUT")
        .uri(format!("/admin/users/{}/role", staff_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"role": "admin"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let user: Value = serde_json::from_slice(&body_bytes)?;
    assert_eq!(user.get("roles"), Some(&json!(["admin"])));

    Ok(())
}
