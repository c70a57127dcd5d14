//! Provider selection — builds the configured inference client.

use std::sync::Arc;
use std::time::Duration;
use calmwire_config::InferenceConfig;
use calmwire_core::error::InferenceError;
use calmwire_core::inference::InferenceClient;
use crate::anthropic::AnthropicClient;
use crate::openai_compat::OpenAiCompatClient;

/// Build the inference client named by `config.provider`.
///
/// `anthropic` uses the native Messages API; every other name is treated
/// as an OpenAI-compatible endpoint. A `custom:` prefix takes the rest of
/// the string as the base URL.
pub fn build_from_config(config: &InferenceConfig) -> Result<Arc<dyn InferenceClient>, InferenceError> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let timeout = Duration::from_secs(config.request_timeout_secs);

    if api_key.is_empty() && requires_key(&config.provider) {
        return Err(InferenceError::NotConfigured(format!(
            "no API key for provider '{}'",
            config.provider
        )));
    }

    if config.provider == "anthropic" {
        let mut client = AnthropicClient::new(&api_key, timeout)?;
        if let Some(url) = &config.api_url {
            client = client.with_base_url(check_base_url(url)?);
        }
        return Ok(Arc::new(client));
    }

    let (name, base_url) = match config.provider.strip_prefix("custom:") {
        Some(url) => ("custom".to_string(), url.to_string()),
        None => (
            config.provider.clone(),
            config
                .api_url
                .clone()
                .unwrap_or_else(|| default_base_url(&config.provider)),
        ),
    };

    let base_url = check_base_url(&base_url)?;
    Ok(Arc::new(OpenAiCompatClient::new(name, base_url, api_key, timeout)?))
}

fn check_base_url(url: &str) -> Result<&str, InferenceError> {
    reqwest::Url::parse(url)
        .map(|_| url)
        .map_err(|e| InferenceError::NotConfigured(format!("invalid base URL '{url}': {e}")))
}

fn requires_key(provider: &str) -> bool {
    !matches!(provider, "ollama" | "vllm" | "llamacpp" | "llama.cpp") && !provider.starts_with("custom:")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str, key: Option<&str>) -> InferenceConfig {
        InferenceConfig {
            provider: provider.into(),
            api_key: key.map(String::from),
            ..InferenceConfig::default()
        }
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn builds_openai_compatible_by_default() {
        let client = build_from_config(&config("openrouter", Some("sk-test"))).unwrap();
        assert_eq!(client.name(), "openrouter");
    }

    #[test]
    fn builds_native_anthropic() {
        let client = build_from_config(&config("anthropic", Some("sk-ant"))).unwrap();
        assert_eq!(client.name(), "anthropic");
    }

    #[test]
    fn custom_prefix_uses_given_url() {
        let client = build_from_config(&config("custom:http://10.0.0.5:9000/v1", None)).unwrap();
        assert_eq!(client.name(), "custom");
    }

    #[test]
    fn malformed_urls_are_not_configured() {
        let err = build_from_config(&config("custom:not a url", None)).err().unwrap();
        assert!(matches!(err, InferenceError::NotConfigured(_)));

        let mut bad = config("openai", Some("sk-test"));
        bad.api_url = Some("::nope".into());
        let err = build_from_config(&bad).err().unwrap();
        assert!(matches!(err, InferenceError::NotConfigured(_)));
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = build_from_config(&config("openai", None)).err().unwrap();
        assert!(matches!(err, InferenceError::NotConfigured(_)));
    }

    #[test]
    fn local_providers_need_no_key() {
        assert!(build_from_config(&config("ollama", None)).is_ok());
    }
}
