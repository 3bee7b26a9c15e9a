//! HTTP scenarios for per-user settings against a real database.

#![cfg(feature = "db-tests")]

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, send};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn settings_are_saved_and_replaced_per_user(pool: PgPool) {
    let response = send(build_test_app(pool.clone()), Method::GET, "/api/v1/config", Some(1), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let body = json!({ "properties": { "theme": "dark", "page_size": 25 } });
    let response = send(build_test_app(pool.clone()), Method::PUT, "/api/v1/config", Some(1), Some(body)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["data"]["user_id"], 1);
    assert_eq!(saved["data"]["properties"]["page_size"], 25);

    // A second save replaces the whole object.
    let body = json!({ "properties": { "theme": "light" } });
    let response = send(build_test_app(pool.clone()), Method::PUT, "/api/v1/config", Some(1), Some(body)).await;
    let replaced = body_json(response).await;
    assert_eq!(replaced["data"]["id"], saved["data"]["id"]);

    let response = send(build_test_app(pool.clone()), Method::GET, "/api/v1/config", Some(1), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["data"]["properties"], json!({ "theme": "light" }));

    // Settings are not journaled.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM action_logs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    let response = send(build_test_app(pool), Method::GET, "/api/v1/config", Some(2), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
