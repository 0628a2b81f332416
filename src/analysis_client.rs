//! Remote triage engine access.
//!
//! `AnalysisClient` is the seam between the session and the engine. The HTTP
//! implementation is stateless: it serializes the request, performs one
//! `POST /analyze`, and decodes the reply. It never retries. A slow or absent
//! engine surfaces as `ServiceUnavailable` instead of being hidden.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Notify;

use crate::codec::{self, CodecError};
use crate::config::ServiceConfig;
use crate::models::{AnalysisRequest, AnalysisResult};

/// Message shown to the user for any failed analysis. Internal detail is
/// logged, never displayed.
pub const UNAVAILABLE_MESSAGE: &str =
    "The analysis engine is currently unavailable. Please try again later.";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("Analysis engine unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Malformed analysis result: {0}")]
    MalformedResult(#[from] CodecError),
}

impl AnalysisError {
    /// User-facing text for the failed state.
    pub fn user_message(&self) -> &'static str {
        UNAVAILABLE_MESSAGE
    }
}

/// Triage engine abstraction (allows mocking).
pub trait AnalysisClient {
    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send;
}

// ═══════════════════════════════════════════════════════════
// HttpAnalysisClient
// ═══════════════════════════════════════════════════════════

/// Reply from the engine's `GET /` health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
}

/// HTTP client for the remote triage engine.
pub struct HttpAnalysisClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpAnalysisClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AnalysisError::ServiceUnavailable(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn from_env() -> Result<Self, AnalysisError> {
        Self::new(&ServiceConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query the engine's health endpoint.
    pub async fn health(&self) -> Result<ServiceHealth, AnalysisError> {
        let url = format!("{}/", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::ServiceUnavailable(format!(
                "health check returned status {}",
                status.as_u16()
            )));
        }

        response
            .json::<ServiceHealth>()
            .await
            .map_err(|e| AnalysisError::MalformedResult(CodecError::Json(e.to_string())))
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        let detail = if e.is_connect() {
            format!("engine not reachable at {}", self.base_url)
        } else if e.is_timeout() {
            format!("request timed out after {}s", self.timeout_secs)
        } else {
            e.to_string()
        };
        AnalysisError::ServiceUnavailable(detail)
    }
}

impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let url = format!("{}/analyze", self.base_url);
        tracing::debug!(
            %url,
            medications = request.medications.len(),
            "Sending analysis request"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Engine returned error status");
            return Err(AnalysisError::ServiceUnavailable(format!(
                "engine returned status {}",
                status.as_u16()
            )));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let result = codec::decode_str(&body)?;
        tracing::debug!(triage_level = %result.triage_level, "Analysis decoded");
        Ok(result)
    }
}

// ═══════════════════════════════════════════════════════════
// MockAnalysisClient
// ═══════════════════════════════════════════════════════════

/// Canned engine for tests and offline demos. Replies with a wire payload
/// (decoded like a real reply) or a fixed error.
pub struct MockAnalysisClient {
    outcome: Result<Value, AnalysisError>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<AnalysisRequest>>,
}

impl MockAnalysisClient {
    pub fn responding(payload: Value) -> Self {
        Self::with_outcome(Ok(payload))
    }

    pub fn failing(error: AnalysisError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<Value, AnalysisError>) -> Self {
        Self {
            outcome,
            gate: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Hold every reply until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of `analyze` calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.last_request.lock().ok()?.clone()
    }

    fn record(&self, request: &AnalysisRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }
    }
}

impl AnalysisClient for MockAnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        self.record(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let payload = self.outcome.clone()?;
        Ok(codec::decode(payload)?)
    }
}

impl<C: AnalysisClient> AnalysisClient for Arc<C> {
    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResult, AnalysisError>> + Send {
        (**self).analyze(request)
    }
}
