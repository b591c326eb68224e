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

/// Poll the projection until the expected event shows up. The listener is
/// async, so entries land shortly after the request returns.
async fn wait_for_event(pool: &SqlitePool, event_name: &str) -> Result<Vec<(String, String)>> {
    for _ in 0..15 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT event_name, description FROM activity_log WHERE event_name = ?")
                .bind(event_name)
                .fetch_all(pool)
                .await?;

        if !rows.is_empty() {
            return Ok(rows);
        }
    }
    Ok(Vec::new())
}

#[tokio::test]
async fn grant_and_revoke_are_audited() -> Result<()> {
    let (app, pool, _dir) = setup("audit.db").await?;

    let (admin_token, admin_id) = register(&app, "The Admin", "admin@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(&admin_id)
        .execute(&pool)
        .await?;
    let (_staff_token, staff_id) = register(&app, "Clerk", "clerk@example.com").await?;

    // grant
    let req = Request::builder()
        .method("POST")
        .uri(format!("/admin/users/{}/permissions", staff_id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::from(json!({"slug": "report.view"}).to_string()))?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let logs = wait_for_event(&pool, "grant.created").await?;
    assert!(!logs.is_empty(), "activity log should contain grant.created");
    assert_eq!(logs[0].1, "Permission granted");

    // revoke
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/admin/users/{}/permissions/report.view", staff_id))
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let logs = wait_for_event(&pool, "grant.revoked").await?;
    assert!(!logs.is_empty(), "activity log should contain grant.revoked");
    assert_eq!(logs[0].1, "Permission revoked");

    // the admin activity endpoint serves the projection
    let req = Request::builder()
        .method("GET")
        .uri("/admin/activity")
        .header("authorization", format!("Bearer {}", admin_token))
        .body(Body::empty())?;
    let resp: Response = app.clone().oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let body_bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let activity: Value = serde_json::from_slice(&body_bytes)?;
    let names: Vec<&str> = activity
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.get("event_name").unwrap().as_str().unwrap())
        .collect();
    assert!(names.contains(&"grant.created"));
    assert!(names.contains(&"grant.revoked"));

    Ok(())
}

#[tokio::test]
async fn event_store_forms_a_hash_chain() -> Result<()> {
    let (app, pool, _dir) = setup("hash_chain.db").await?;

    let (admin_token, admin_id) = register(&app, "The Admin", "admin@example.com").await?;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(&admin_id)
        .execute(&pool)
        .await?;
    let (_staff_token, staff_id) = register(&app, "Clerk", "clerk@example.com").await?;

    for slug in ["order.list", "order.create"] {
        let req = Request::builder()
            .method("POST")
            .uri(format!("/admin/users/{}/permissions", staff_id))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", admin_token))
            .body(Body::from(json!({"slug": slug}).to_string()))?;
        let resp: Response = app.clone().oneshot(req).await?;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // wait for both grant events to be persisted
    let mut rows: Vec<(Option<String>, String, String)> = Vec::new();
    for _ in 0..15 {
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        rows = sqlx::query_as(
            "SELECT prev_hash, hash, payload FROM event_store WHERE event_name = 'grant.created' ORDER BY rowid",
        )
        .fetch_all(&pool)
        .await?;
        if rows.len() >= 2 {
            break;
        }
    }
    assert!(rows.len() >= 2, "expected at least two chained events");

    // each hash covers the previous hash plus the payload
    use sha2::{Digest, Sha256};
    for window in rows.windows(2) {
        let (_, prev_hash, _) = &window[0];
        let (chained_prev, hash, payload) = &window[1];
        assert_eq!(chained_prev.as_deref(), Some(prev_hash.as_str()));

        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(payload.as_bytes());
        assert_eq!(*hash, hex::encode(hasher.finalize()));
    }

    Ok(())
}
