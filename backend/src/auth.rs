use axum::{extract::State, http::StatusCode, Json};
use bcrypt::{hash, verify};
use common::{utils::is_valid_username, Credentials, RefreshRequest, TokenPair, UserDto};
use serde::{Deserialize, Serialize};

use base64::engine::{general_purpose, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;

use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::config::JwtConfig;
use crate::db::{self, Db};
use crate::error::AppError;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::web_server::AppState;
use sha2::{Digest, Sha256};
use sqlx::Transaction;

pub const ACCESS_TOKEN_TYPE: &str = "access";

const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

#[derive(sqlx::FromRow, Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // user id
    pub exp: usize,         // expiry, seconds since epoch
    pub jti: String,        // unique per token
    pub token_type: String, // always "access"; refresh tokens are opaque
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRecord {
    user_id: i64,
    expires_at: chrono::NaiveDateTime,
}

// --- Token helpers ---

/// Hex SHA-256 of an opaque refresh token; only this digest is stored.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn encode_access_token(user_id: i64, jwt_config: &JwtConfig) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::minutes(jwt_config.access_token_expires_minutes))
        .timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
        jti: uuid::Uuid::new_v4().to_string(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_ref()),
    )?)
}

/// Verifies signature, expiry and token type of an access token.
pub fn decode_access_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_ref()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!("Rejected access token: {}", e);
        AppError::InvalidToken
    })?;

    if token_data.claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(AppError::InvalidToken);
    }
    Ok(token_data.claims)
}

async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {e}")))?
        .map_err(|e| {
            tracing::error!("Failed to hash password: {}", e);
            AppError::InternalServerError("Password hashing error".to_string())
        })
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, AppError> {
    let matches = tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Verify task failed: {e}")))??;
    Ok(matches)
}

/// Creates a new access token and a new refresh token for a user.
/// The hashed refresh token replaces whatever the user had stored. Runs on the
/// caller's transaction; the caller commits.
async fn issue_tokens(
    user_id: i64,
    tx: &mut Transaction<'_, Db>,
    jwt_config: &JwtConfig,
) -> Result<TokenPair, AppError> {
    let access = encode_access_token(user_id, jwt_config)?;

    let mut refresh_token_bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut refresh_token_bytes);
    let refresh = general_purpose::URL_SAFE_NO_PAD.encode(refresh_token_bytes);
    let refresh_hash = hash_refresh_token(&refresh);
    let refresh_exp =
        (Utc::now() + Duration::days(jwt_config.refresh_token_expires_days)).naive_utc();

    // One refresh token per user: logging in again ends the previous session.
    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)
         ON CONFLICT(user_id) DO UPDATE SET token_hash = excluded.token_hash, expires_at = excluded.expires_at",
    )
    .bind(user_id)
    .bind(&refresh_hash)
    .bind(refresh_exp)
    .execute(&mut **tx)
    .await?;

    Ok(TokenPair { access, refresh })
}

// --- API Handlers ---

/// Register a new user.
///
/// Open to anonymous callers. The password is bcrypt-hashed before storage
/// and never returned.
#[utoipa::path(
    post,
    path = "/api/auth/register/",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 201, description = "User created", body = UserDto),
        (status = 400, description = "Field errors, including a duplicate username"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<Credentials>,
) -> Result<(StatusCode, Json<UserDto>), AppError> {
    if !is_valid_username(&payload.username) {
        return Err(AppError::field_error("username", "invalid", INVALID_USERNAME));
    }

    tracing::info!("Registering user: {}", &payload.username);
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&state.db_pool)
        .await?;

    if existing.is_some() {
        tracing::info!("Username already taken: {}", &payload.username);
        return Err(AppError::duplicate_username());
    }

    let password_hash =
        hash_password(payload.password, state.app_config.jwt.password_hash_cost).await?;

    // A concurrent registration can still win the race; the unique index decides.
    let user: UserDto = sqlx::query_as(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id, username",
    )
    .bind(&payload.username)
    .bind(&password_hash)
    .fetch_one(&state.db_pool)
    .await
    .map_err(|e| {
        if db::is_unique_violation(&e) {
            AppError::duplicate_username()
        } else {
            tracing::error!("Failed to create user: {}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Obtain an access/refresh token pair.
#[utoipa::path(
    post,
    path = "/api/auth/token/",
    tag = "auth",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Unknown user or wrong password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<Credentials>,
) -> Result<Json<TokenPair>, AppError> {
    tracing::info!("Logging in user: {}", &payload.username);
    let user: User = sqlx::query_as(
        "SELECT id, username, password_hash FROM users WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(payload.password, user.password_hash).await? {
        tracing::warn!("Wrong password for user: {}", user.username);
        return Err(AppError::InvalidCredentials);
    }

    let mut tx = state.db_pool.begin().await?;
    let tokens = issue_tokens(user.id, &mut tx, &state.app_config.jwt).await?;
    tx.commit().await?;

    Ok(Json(tokens))
}

/// Exchange a refresh token for a new pair. The presented token is consumed.
#[utoipa::path(
    post,
    path = "/api/auth/token/refresh/",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let incoming_hash = hash_refresh_token(&payload.refresh);

    let mut tx = state.db_pool.begin().await?;

    // Claim the token by deleting it; of two concurrent requests only one gets the row.
    let record: RefreshTokenRecord = sqlx::query_as(
        "DELETE FROM refresh_tokens WHERE token_hash = $1 RETURNING user_id, expires_at",
    )
    .bind(&incoming_hash)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::InvalidToken)?;

    if record.expires_at < Utc::now().naive_utc() {
        // Keep the delete: an expired token is dropped as it is rejected.
        tx.commit().await?;
        tracing::info!("Expired refresh token for user {}", record.user_id);
        return Err(AppError::InvalidToken);
    }

    tracing::info!("Rotating refresh token for user {}", record.user_id);
    let tokens = issue_tokens(record.user_id, &mut tx, &state.app_config.jwt).await?;
    tx.commit().await?;

    Ok(Json(tokens))
}

/// Revoke the caller's refresh token.
#[utoipa::path(
    post,
    path = "/api/auth/logout/",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Logged out"),
        (status = 401, description = "Authentication required"),
    )
)]
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> Result<StatusCode, AppError> {
    tracing::info!("Logging out user: {}", user.username);
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user.id)
        .execute(&state.db_pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// --- Middleware for JWT Authentication ---

pub async fn auth_middleware(
    State(state): State<AppState>,
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = auth_header
        .ok_or(AppError::NotAuthenticated)?
        .token()
        .to_owned();

    let claims = decode_access_token(&token, &state.app_config.jwt)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

    // A valid signature is not enough: the user may have been removed since.
    let user: UserDto = sqlx::query_as("SELECT id, username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or(AppError::InvalidToken)?;

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
    });

    Ok(next.run(request).await)
}
