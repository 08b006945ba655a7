//! HTTP client for the modelshare API.
//!
//! Configuration is via environment variables:
//! - `MODELSHARE_URL` - Base URL (default: `http://localhost:3000/api/v1`)

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

/// Default URL for local development.
const DEFAULT_URL: &str = "http://localhost:3000/api/v1";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    Server(String),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("MODELSHARE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

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
                _ => Err(ClientError::Server(format!("{}: {}", status, body))),
            }
        }
    }

    /// Store a seed model.
    pub async fn create_model(&self, code: &str) -> Result<Model, ClientError> {
        let response = self
            .client
            .post(self.url("/models"))
            .json(&CreateModelInput {
                code: code.to_string(),
            })
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Share `code` as a derivation of `current_model_id`.
    pub async fn share(
        &self,
        code: &str,
        current_model_id: Option<Uuid>,
    ) -> Result<ShareResult, ClientError> {
        let response = self
            .client
            .post(self.url("/share"))
            .json(&ShareInput {
                code: code.to_string(),
                current_model_id,
            })
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Resolve a link to the source it grants access to.
    pub async fn resolve_link(&self, link_id: Uuid) -> Result<ResolvedLink, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/links/{}", link_id)))
            .send()
            .await?;
        self.handle_response(response).await
    }

    pub async fn get_lineage(&self, model_id: Uuid) -> Result<Vec<ModelSummary>, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/models/{}/lineage", model_id)))
            .send()
            .await?;
        self.handle_response(response).await
    }
}
