//! Inference client trait — the abstraction over the remote generative model.
//!
//! A client knows how to send one system + user instruction pair to a model
//! and hand back the raw text. It is transport only: it never inspects the
//! reply and never decides whether a failure is retryable.
//!
//! Implementations: OpenAI-compatible endpoints, Anthropic Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::InferenceError;

/// One inference call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// The model to use (e.g., "anthropic/claude-3.5-haiku", "gpt-4o-mini")
    pub model: String,

    /// System instruction (role, rules, output format)
    pub system: String,

    /// User instruction (context + message under analysis)
    pub user: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.3
}

/// A complete response from the inference service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Untrusted free-form text, expected to contain one JSON document
    pub text: String,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core inference trait.
///
/// The mediator calls `complete()` without knowing which backend is in use.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// A human-readable name for this client (e.g., "openrouter", "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get the complete reply text.
    async fn complete(
        &self,
        request: InferenceRequest,
    ) -> std::result::Result<InferenceResponse, InferenceError>;

    /// Health check — can we reach the service?
    async fn health_check(&self) -> std::result::Result<bool, InferenceError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_temperature_defaults_when_absent() {
        let req: InferenceRequest = serde_json::from_str(
            r#"{"model":"m","system":"s","user":"u","max_tokens":100}"#,
        )
        .unwrap();
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, 100);
    }
}
