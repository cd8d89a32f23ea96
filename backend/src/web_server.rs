use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::{auth, docs, items};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub app_config: AppConfig,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

pub async fn run_server(app_state: AppState) -> anyhow::Result<()> {
    let addr = app_state.app_config.socket_addr();
    let app = create_router(app_state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Serving inventory API at http://{}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

pub fn create_router(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.app_config.web.cors_origin);

    // Open to anonymous callers
    let public_routes = Router::new()
        .route("/health/", get(health))
        .route("/openapi.json", get(docs::openapi_json))
        .route("/auth/register/", post(auth::register))
        .route("/auth/token/", post(auth::login))
        .route("/auth/token/refresh/", post(auth::refresh));

    let protected_routes = Router::new()
        .route("/auth/logout/", post(auth::logout))
        .route("/items/", get(items::list_items).post(items::create_item))
        .route(
            "/items/{id}/",
            get(items::get_item)
                .put(items::update_item)
                .patch(items::patch_item)
                .delete(items::delete_item),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(app_state)
}

/// `*` allows any origin; otherwise a comma-separated list of exact origins.
fn cors_layer(cors_origin: &str) -> CorsLayer {
    let allow_origin = if cors_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors_origin
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match HeaderValue::from_str(s) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", s);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health/",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "inventory-api".to_string(),
    })
}
