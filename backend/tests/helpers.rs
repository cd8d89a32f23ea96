// backend/tests/helpers.rs
#![allow(dead_code)]
#![cfg(feature = "db-sqlite")]

use backend::config::{AppConfig, DatabaseConfig, JwtConfig, WebConfig};
use backend::web_server::AppState;
use common::{Credentials, TokenPair};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::TcpListener;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_USERNAME: &str = "testuser";
pub const TEST_PASSWORD: &str = "password123";

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
});

pub fn test_config(port: u16) -> AppConfig {
    AppConfig {
        web: WebConfig {
            addr: "127.0.0.1".to_string(),
            port,
            cors_origin: "http://localhost:8081".to_string(),
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expires_minutes: 15,
            refresh_token_expires_days: 7,
            // bcrypt's minimum; keeps the suite fast
            password_hash_cost: 4,
        },
    }
}

/// Fresh in-memory database with the schema applied.
pub async fn test_pool() -> SqlitePool {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    // A single connection that never gets recycled, or the in-memory db is lost.
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_options)
        .await
        .expect("Failed to create in-memory database pool.");

    backend::db::MIGRATOR
        .run(&db_pool)
        .await
        .expect("Failed to run migrations on test database.");

    db_pool
}

/// Spawn a test server and return the address, a reqwest client and the pool.
pub async fn spawn_app() -> (SocketAddr, reqwest::Client, SqlitePool) {
    Lazy::force(&TRACING);

    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let db_pool = test_pool().await;
    let app_state = AppState {
        db_pool: db_pool.clone(),
        app_config: test_config(addr.port()),
    };

    let app = backend::web_server::create_router(app_state);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    (addr, client, db_pool)
}

pub fn api_url(addr: &SocketAddr, path: &str) -> String {
    format!("http://{addr}/api/{}", path.trim_start_matches('/'))
}

pub fn credentials(username: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: TEST_PASSWORD.to_string(),
    }
}

/// Registers `username` and logs in, returning the token pair.
pub async fn register_and_login(
    addr: &SocketAddr,
    client: &reqwest::Client,
    username: &str,
) -> TokenPair {
    let credentials = credentials(username);

    let res = client
        .post(api_url(addr, "auth/register/"))
        .json(&credentials)
        .send()
        .await
        .expect("Failed to register user");
    assert_eq!(res.status(), StatusCode::CREATED, "Registration failed");

    let response = client
        .post(api_url(addr, "auth/token/"))
        .json(&credentials)
        .send()
        .await
        .expect("Failed to login user");

    let status = response.status();
    let body_text = response.text().await.expect("Failed to read response body");
    assert_eq!(status, StatusCode::OK, "Login failed: {body_text}");

    serde_json::from_str(&body_text).expect("Failed to parse login response")
}

/// Helper to register and login the default test user, returning the access token.
pub async fn get_auth_token(addr: &SocketAddr, client: &reqwest::Client) -> String {
    register_and_login(addr, client, TEST_USERNAME).await.access
}
