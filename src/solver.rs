//! Solver RPC.
//!
//! The solver is opaque: it receives the full model source and a command
//! index, and answers with a batch of outcomes plus the id of the model row
//! it recorded for the execution. Model errors come back as data inside a
//! successful reply; only transport failures use the error channel.
//!
//! Configuration for [`HttpSolver::from_env`]:
//! - `MODELSHARE_SOLVER_URL` - Base URL (default: `http://localhost:8080`)
//! - `MODELSHARE_SOLVER_TIMEOUT_SECS` - Per-request timeout (default: 60)

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use crate::models::{NavDirection, SolveRequest, SolveResponse, SolverModelId};

const DEFAULT_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Transport-level solver failures.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Solver returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Solver unavailable: {0}")]
    Unavailable(String),
}

/// The contract the execution controller needs from a solver.
pub trait Solver: Send + Sync {
    /// Execute a command from scratch.
    fn get_instances(
        &self,
        request: SolveRequest,
    ) -> impl Future<Output = Result<SolveResponse, SolverError>> + Send;

    /// Fetch the next batch for the command last executed under
    /// `request.last_id`.
    fn next_instances(
        &self,
        request: SolveRequest,
    ) -> impl Future<Output = Result<SolveResponse, SolverError>> + Send;

    /// Log a navigation step. Failures are informational only.
    fn record_navigation(
        &self,
        direction: NavDirection,
        index: usize,
        last_id: Option<SolverModelId>,
    ) -> impl Future<Output = Result<(), SolverError>> + Send {
        let _ = (direction, index, last_id);
        async { Ok(()) }
    }
}

/// HTTP solver client.
#[derive(Debug, Clone)]
pub struct HttpSolver {
    base_url: String,
    client: Client,
}

impl HttpSolver {
    /// Create client from environment variables.
    pub fn from_env() -> Result<Self, SolverError> {
        let base_url =
            std::env::var("MODELSHARE_SOLVER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let timeout = std::env::var("MODELSHARE_SOLVER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::new(base_url, Duration::from_secs(timeout))
    }

    /// Create with explicit configuration.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SolverError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Send a request, converting non-success statuses to [`SolverError::Status`].
    async fn send(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<reqwest::Response, SolverError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "Calling solver");
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SolverError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T, SolverError> {
        Ok(self.send(path, body).await?.json().await?)
    }
}

impl Solver for HttpSolver {
    async fn get_instances(&self, request: SolveRequest) -> Result<SolveResponse, SolverError> {
        self.post("/getInstances", &request).await
    }

    async fn next_instances(&self, request: SolveRequest) -> Result<SolveResponse, SolverError> {
        self.post("/nextInstances", &request).await
    }

    async fn record_navigation(
        &self,
        direction: NavDirection,
        index: usize,
        last_id: Option<SolverModelId>,
    ) -> Result<(), SolverError> {
        let body = serde_json::json!({
            "direction": direction.code(),
            "index": index,
            "lastId": last_id,
        });
        self.send("/navInstance", &body).await.map(|_| ())
    }
}
