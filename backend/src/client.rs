//! Typed HTTP client for the inventory API.
//!
//! Used by the `smoke` binary against a running server and by the
//! integration tests against a spawned one. Every call checks for one
//! expected status; anything else comes back as
//! [`ClientError::UnexpectedStatus`] with the response body attached.

use std::time::Duration;

use common::{Credentials, Item, ItemPayload, TokenPair, UserDto};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("not logged in")]
    NotAuthenticated,

    #[error("check failed: {0}")]
    Check(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Created(UserDto),
    AlreadyExists,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:8080/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(ClientError::NotAuthenticated)?;
        Ok(builder.bearer_auth(token))
    }

    async fn expect(response: Response, expected: StatusCode) -> Result<Response, ClientError> {
        let status = response.status();
        if status == expected {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::UnexpectedStatus { status, body })
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.http.get(self.url("health/")).send().await?;
        Self::expect(response, StatusCode::OK).await?;
        Ok(())
    }

    /// Registers a user. A 400 naming `username` as already taken is reported
    /// as [`Registration::AlreadyExists`] so repeated runs can proceed.
    pub async fn register(&self, credentials: &Credentials) -> Result<Registration, ClientError> {
        let response = self
            .http
            .post(self.url("auth/register/"))
            .json(credentials)
            .send()
            .await?;

        match response.status() {
            StatusCode::CREATED => Ok(Registration::Created(response.json().await?)),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                if username_taken(&body) {
                    Ok(Registration::AlreadyExists)
                } else {
                    Err(ClientError::UnexpectedStatus {
                        status: StatusCode::BAD_REQUEST,
                        body,
                    })
                }
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status, body })
            }
        }
    }

    /// Logs in and keeps the access token for later calls.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<TokenPair, ClientError> {
        let response = self
            .http
            .post(self.url("auth/token/"))
            .json(credentials)
            .send()
            .await?;
        let tokens: TokenPair = Self::expect(response, StatusCode::OK).await?.json().await?;
        self.access_token = Some(tokens.access.clone());
        Ok(tokens)
    }

    pub async fn create_item(&self, item: &ItemPayload) -> Result<Item, ClientError> {
        let request = self.authorized(self.http.post(self.url("items/")).json(item))?;
        let response = request.send().await?;
        Ok(Self::expect(response, StatusCode::CREATED).await?.json().await?)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, ClientError> {
        let request = self.authorized(self.http.get(self.url("items/")))?;
        let response = request.send().await?;
        Ok(Self::expect(response, StatusCode::OK).await?.json().await?)
    }

    /// `Ok(None)` when the server answers 404.
    pub async fn get_item(&self, id: i64) -> Result<Option<Item>, ClientError> {
        let request = self.authorized(self.http.get(self.url(&format!("items/{id}/"))))?;
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::expect(response, StatusCode::OK).await?.json().await?))
    }

    pub async fn update_item(&self, id: i64, item: &ItemPayload) -> Result<Item, ClientError> {
        let request =
            self.authorized(self.http.put(self.url(&format!("items/{id}/"))).json(item))?;
        let response = request.send().await?;
        Ok(Self::expect(response, StatusCode::OK).await?.json().await?)
    }

    pub async fn delete_item(&self, id: i64) -> Result<(), ClientError> {
        let request = self.authorized(self.http.delete(self.url(&format!("items/{id}/"))))?;
        let response = request.send().await?;
        Self::expect(response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }
}

fn username_taken(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    value["username"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(Value::as_str)
                .any(|m| m.contains("already exists"))
        })
        .unwrap_or(false)
}
