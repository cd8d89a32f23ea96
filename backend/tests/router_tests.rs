#![cfg(feature = "db-sqlite")]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use backend::{
    auth::encode_access_token,
    web_server::{create_router, AppState},
};
use common::Item;
use http_body_util::BodyExt; // for .collect()
use serde_json::Value;
use tower::ServiceExt; // for .oneshot()

mod helpers;

/// Router over a fresh database holding one user, plus an access token for them.
async fn app_with_user() -> (Router, String) {
    let db_pool = helpers::test_pool().await;
    let config = helpers::test_config(0);

    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind("router_user")
    .bind("not-a-real-hash")
    .fetch_one(&db_pool)
    .await
    .unwrap();
    let token = encode_access_token(user_id, &config.jwt).unwrap();

    let app = create_router(AppState {
        db_pool,
        app_config: config,
    });
    (app, token)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = app_with_user().await;

    let response = app
        .oneshot(Request::builder().uri("/api/health/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let (app, _) = app_with_user().await;

    let response = app
        .oneshot(Request::builder().uri("/api/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/api/items/{id}/"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_create_then_get_single_item() {
    let (app, token) = app_with_user().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/items/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"name": "Torque wrench", "description": "1/2 inch", "quantity": 4}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Item = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(created.id, 1); // Server should assign the first ID

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/items/1/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let found: Item = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(found, created);
}

#[tokio::test]
async fn test_missing_item_is_not_found() {
    let (app, token) = app_with_user().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/items/42/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["detail"], "Not found.");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, token) = app_with_user().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/items/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_bad_query_and_path_params_are_bad_request() {
    let (app, token) = app_with_user().await;

    for uri in [
        "/api/items/?page=abc",
        "/api/items/?page=0",
        "/api/items/?per_page=500",
        "/api/items/abc/",
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_json(response).await;
        assert!(body.is_object(), "{uri}: {body}");
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/items/?page=abc")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(body_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let (app, _) = app_with_user().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/items/")
                .header(header::ORIGIN, "http://localhost:8081")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:8081"
    );
}
