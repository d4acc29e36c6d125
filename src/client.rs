//! HTTP client for a remote drill catalog.
//!
//! Used when the planner runs against a shared catalog server instead of its
//! local database. Configuration is via environment variables:
//! - `DRILLBOOK_CATALOG_URL` - Base URL (default: `http://localhost:3000/api/v1`)
//! - `DRILLBOOK_API_KEY` - API key for authentication (optional)
//!
//! Every request is bounded by a timeout, so a hung catalog server surfaces
//! as an error instead of a request that never completes.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::composer::CatalogSource;
use crate::models::{Drill, DrillQuery};

/// Default URL for local development.
pub const DEFAULT_URL: &str = "http://localhost:3000/api/v1";

/// Upper bound on a whole request, connect to last byte.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: API key required or invalid")]
    Unauthorized,

    #[error("Server error: {0}")]
    Server(String),
}

/// HTTP client for a drill catalog API.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl CatalogClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("DRILLBOOK_CATALOG_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var("DRILLBOOK_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    /// Create with explicit configuration and the default timeout.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build catalog client, using defaults: {}", e);
                Client::new()
            });
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional auth header.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Handle response, converting HTTP errors to ClientError.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
                StatusCode::BAD_REQUEST => Err(ClientError::BadRequest(body)),
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    /// Query the remote catalog.
    pub async fn query_drills(&self, query: &DrillQuery) -> Result<Vec<Drill>, ClientError> {
        let response = self
            .request(reqwest::Method::GET, "/drills")
            .query(query)
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Check that the remote server is reachable.
    pub async fn health(&self) -> Result<(), ClientError> {
        let response = self.request(reqwest::Method::GET, "/health").send().await?;
        self.handle_response::<serde_json::Value>(response)
            .await
            .map(|_| ())
    }
}

impl CatalogSource for CatalogClient {
    async fn query(&self, query: &DrillQuery) -> anyhow::Result<Vec<Drill>> {
        Ok(self.query_drills(query).await?)
    }
}
