// crates/workloom-router/src/http.rs
// ============================================================================
// Module: HTTP Text Backend
// Description: Built-in text generation backend over a JSON HTTP endpoint.
// Purpose: Serve text generation from a local or remote completion server.
// Dependencies: reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! The HTTP text backend posts a JSON completion request to a configured
//! endpoint and decodes a `{"text": ...}` response. The availability probe
//! issues a cheap GET against the endpoint's health path on every routing
//! attempt, so an unreachable server is skipped without caller changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::runtime::BackendError;
use crate::runtime::TextBackend;
use crate::runtime::TextRequest;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Default request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default availability probe timeout in milliseconds.
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;

/// Configuration for the HTTP text backend.
///
/// # Invariants
/// - `endpoint` is the completion URL; `health_path` is joined onto its
///   origin for availability probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTextBackendConfig {
    /// Completion endpoint URL.
    pub endpoint: String,
    /// Optional model label forwarded with every request.
    #[serde(default)]
    pub model: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Health probe path appended to the endpoint.
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

/// Returns the default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Returns the default health probe path.
fn default_health_path() -> String {
    "/health".to_string()
}

// ============================================================================
// SECTION: Wire Shapes
// ============================================================================

/// JSON request body posted to the completion endpoint.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    /// Model label, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    /// Prompt text.
    prompt: &'a str,
    /// Optional system preamble.
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    /// Optional completion token cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// JSON response body expected from the completion endpoint.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    /// Generated text.
    text: String,
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Text generation backend over a JSON HTTP endpoint.
pub struct HttpTextBackend {
    /// Backend configuration.
    config: HttpTextBackendConfig,
    /// Blocking HTTP client with the configured request timeout.
    client: reqwest::blocking::Client,
    /// Short-timeout client used only for availability probes.
    probe_client: reqwest::blocking::Client,
}

impl HttpTextBackend {
    /// Creates a backend from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Call`] when the HTTP clients cannot be built.
    pub fn new(config: HttpTextBackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| BackendError::Call(err.to_string()))?;
        let probe_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS))
            .build()
            .map_err(|err| BackendError::Call(err.to_string()))?;
        Ok(Self {
            config,
            client,
            probe_client,
        })
    }

    /// Returns the probe URL derived from the endpoint and health path.
    fn probe_url(&self) -> String {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        format!("{endpoint}{}", self.config.health_path)
    }
}

impl TextBackend for HttpTextBackend {
    fn available(&self) -> bool {
        self.probe_client
            .get(self.probe_url())
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    fn generate(&self, request: &TextRequest) -> Result<String, BackendError> {
        let body = CompletionRequest {
            model: self.config.model.as_deref(),
            prompt: &request.prompt,
            system: request.system.as_deref(),
            max_tokens: request.max_tokens,
        };
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    BackendError::TimedOut {
                        timeout_ms: self.config.timeout_ms,
                    }
                } else {
                    BackendError::Call(err.to_string())
                }
            })?;
        if !response.status().is_success() {
            return Err(BackendError::Call(format!(
                "completion endpoint returned status {}",
                response.status()
            )));
        }
        let decoded: CompletionResponse = response
            .json()
            .map_err(|err| BackendError::InvalidResponse(err.to_string()))?;
        Ok(decoded.text)
    }
}
