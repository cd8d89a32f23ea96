use std::borrow::Cow;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Database error")]
    DatabaseError(sqlx::Error),

    #[error("Authentication error")]
    JwtError(jsonwebtoken::errors::Error),

    #[error("Authentication error")]
    PasswordError(bcrypt::BcryptError),

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("Given token not valid for any token type")]
    InvalidToken,

    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("Not found.")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),
}

impl AppError {
    /// A field error on `username`, shaped like any other validation failure.
    pub fn duplicate_username() -> Self {
        let mut error = ValidationError::new("unique");
        error.message = Some(Cow::Borrowed(DUPLICATE_USERNAME));
        let mut errors = ValidationErrors::new();
        errors.add("username", error);
        AppError::ValidationError(errors)
    }

    pub fn field_error(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut error = ValidationError::new(code);
        error.message = Some(Cow::Borrowed(message));
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        AppError::ValidationError(errors)
    }
}

/// Flattens validator output into `{"field": ["message", ...]}`.
fn field_errors_body(errors: &ValidationErrors) -> Value {
    let mut body = Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<Value> = field_errors
            .iter()
            .map(|e| match &e.message {
                Some(message) => Value::String(message.to_string()),
                None => Value::String(format!("Invalid value ({}).", e.code)),
            })
            .collect();
        body.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(body)
}

fn unauthorized(detail: &str) -> Response {
    let mut response = (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"api\""),
    );
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::JwtError(e) => {
                tracing::warn!("JWT error: {}", e);
                return unauthorized("Given token not valid for any token type");
            }
            AppError::PasswordError(e) => {
                tracing::warn!("Password error: {}", e);
                return unauthorized("No active account found with the given credentials");
            }
            AppError::NotAuthenticated | AppError::InvalidToken => {
                return unauthorized(&self.to_string());
            }
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ValidationError(errors) => {
                return (StatusCode::BAD_REQUEST, Json(field_errors_body(&errors))).into_response();
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        AppError::JwtError(e)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::PasswordError(e)
    }
}
