//! Anthropic native inference client.
//!
//! Uses Anthropic's Messages API directly (not an OpenAI-compatible proxy):
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System instruction as a top-level field

use async_trait::async_trait;
use calmwire_core::error::InferenceError;
use calmwire_core::inference::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::status::{error_for_status, error_for_transport};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API client.
pub struct AnthropicClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a new Anthropic client.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url
            .into()
            .trim_end_matches('/')
            .trim_end_matches("/v1")
            .to_string();
        self
    }

    fn build_body(request: &InferenceRequest) -> AnthropicRequest<'_> {
        AnthropicRequest {
            model: &request.model,
            system: &request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.user,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    /// Convert an Anthropic API response to our InferenceResponse.
    fn into_response(resp: AnthropicResponse) -> InferenceResponse {
        let text = resp
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                ResponseContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        InferenceResponse {
            text,
            model: resp.model,
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
        }
    }
}

#[async_trait]
impl InferenceClient for AnthropicClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: InferenceRequest,
    ) -> std::result::Result<InferenceResponse, InferenceError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(&request);

        debug!(provider = "anthropic", model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(error_for_transport)?;

        if response.status().as_u16() != 200 {
            return Err(error_for_status(&self.name, response).await);
        }

        let api_resp: AnthropicResponse = response.json().await.map_err(error_for_transport)?;

        Ok(Self::into_response(api_resp))
    }

    async fn health_check(&self) -> std::result::Result<bool, InferenceError> {
        // Minimal request to verify the key
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": "claude-3-5-haiku-latest",
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(error_for_transport)?;

        // 200 = works, 401 = bad key, anything else = reachable but error
        Ok(response.status().is_success() || response.status().as_u16() != 401)
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor() {
        let client = AnthropicClient::new("sk-ant-test", Duration::from_secs(30)).unwrap();
        assert_eq!(client.name(), "anthropic");
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn base_url_override_drops_version_suffix() {
        let client = AnthropicClient::new("k", Duration::from_secs(1))
            .unwrap()
            .with_base_url("https://proxy.internal/v1/");
        assert_eq!(client.base_url, "https://proxy.internal");
    }

    #[test]
    fn system_is_top_level() {
        let req = InferenceRequest {
            model: "claude-3-5-haiku-latest".into(),
            system: "rules".into(),
            user: "message".into(),
            max_tokens: 1500,
            temperature: 0.3,
        };
        let body = serde_json::to_value(AnthropicClient::build_body(&req)).unwrap();
        assert_eq!(body["system"], "rules");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn parse_text_response_skips_other_blocks() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "model": "claude-3-5-haiku-latest",
                "content": [
                    {"type": "thinking", "thinking": "hmm"},
                    {"type": "text", "text": "{\"action\":\"COMMENT\"}"}
                ],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let out = AnthropicClient::into_response(resp);
        assert_eq!(out.text, "{\"action\":\"COMMENT\"}");
        assert_eq!(out.usage.unwrap().total_tokens, 15);
    }
}
