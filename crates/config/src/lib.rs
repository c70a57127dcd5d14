//! Configuration loading, validation, and management for calmwire.
//!
//! Loads configuration from `~/.calmwire/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.calmwire/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediatorConfig {
    /// Remote inference service settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Verdict cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Deadlines for optional stages
    #[serde(default)]
    pub budgets: BudgetConfig,

    /// Intervention and comment rate limits
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Per-room history sizing
    #[serde(default)]
    pub history: HistoryConfig,

    /// Optional pipeline stages
    #[serde(default)]
    pub features: FeatureConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Provider name (openrouter, openai, anthropic, ollama, ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Client-side HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-3.5-haiku".into()
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_temperature() -> f32 {
    0.3
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            api_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry lifetime; 0 disables expiry
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_true() -> bool {
    true
}
fn default_cache_capacity() -> usize {
    1000
}
fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_secs > 0).then(|| Duration::from_secs(self.ttl_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Hard deadline for the structural detector
    #[serde(default = "default_detector_deadline_ms")]
    pub detector_deadline_ms: u64,

    /// Outer budget for the enrichment call
    #[serde(default = "default_enrichment_budget_ms")]
    pub enrichment_budget_ms: u64,

    /// How long the main flow waits for enrichment once everything else is ready
    #[serde(default = "default_enrichment_wait_ms")]
    pub enrichment_wait_ms: u64,
}

fn default_detector_deadline_ms() -> u64 {
    500
}
fn default_enrichment_budget_ms() -> u64 {
    3000
}
fn default_enrichment_wait_ms() -> u64 {
    500
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            detector_deadline_ms: default_detector_deadline_ms(),
            enrichment_budget_ms: default_enrichment_budget_ms(),
            enrichment_wait_ms: default_enrichment_wait_ms(),
        }
    }
}

impl BudgetConfig {
    pub fn detector_deadline(&self) -> Duration {
        Duration::from_millis(self.detector_deadline_ms)
    }

    pub fn enrichment_budget(&self) -> Duration {
        Duration::from_millis(self.enrichment_budget_ms)
    }

    pub fn enrichment_wait(&self) -> Duration {
        Duration::from_millis(self.enrichment_wait_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_max_interventions_per_day")]
    pub max_interventions_per_day: u32,

    /// Minimum gap between two comments in one room
    #[serde(default = "default_comment_cooldown_secs")]
    pub comment_cooldown_secs: u64,
}

fn default_max_interventions_per_day() -> u32 {
    10
}
fn default_comment_cooldown_secs() -> u64 {
    60
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_interventions_per_day: default_max_interventions_per_day(),
            comment_cooldown_secs: default_comment_cooldown_secs(),
        }
    }
}

impl ThrottleConfig {
    pub fn comment_cooldown(&self) -> Duration {
        Duration::from_secs(self.comment_cooldown_secs)
    }
}

/// Hard ceiling on the room FIFO.
pub const MAX_ROOM_HISTORY: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Messages kept per room (at most 30)
    #[serde(default = "default_room_history_cap")]
    pub room_history_cap: usize,

    /// Most recent messages shown to the model
    #[serde(default = "default_prompt_history_messages")]
    pub prompt_history_messages: usize,
}

fn default_room_history_cap() -> usize {
    MAX_ROOM_HISTORY
}
fn default_prompt_history_messages() -> usize {
    15
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            room_history_cap: default_room_history_cap(),
            prompt_history_messages: default_prompt_history_messages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Run the rule-based structural detector
    #[serde(default = "default_true")]
    pub detector: bool,

    /// Ask the model for a deeper-understanding pass before analysis
    #[serde(default)]
    pub enrichment: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            detector: true,
            enrichment: false,
        }
    }
}

impl MediatorConfig {
    /// Load configuration from the default path (~/.calmwire/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CALMWIRE_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    /// - `ANTHROPIC_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_path())
    }

    /// Like [`load`](Self::load), for a file somewhere else.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.inference.api_key.is_none() {
            self.inference.api_key = std::env::var("CALMWIRE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("CALMWIRE_PROVIDER") {
            self.inference.provider = provider;
        }

        if let Ok(model) = std::env::var("CALMWIRE_MODEL") {
            self.inference.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".calmwire")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.inference.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "inference.max_tokens must be > 0".into(),
            ));
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache.capacity must be > 0 when the cache is enabled".into(),
            ));
        }

        if self.history.room_history_cap == 0 || self.history.room_history_cap > MAX_ROOM_HISTORY {
            return Err(ConfigError::ValidationError(format!(
                "history.room_history_cap must be between 1 and {MAX_ROOM_HISTORY}"
            )));
        }

        if self.budgets.enrichment_wait_ms > self.budgets.enrichment_budget_ms {
            return Err(ConfigError::ValidationError(
                "budgets.enrichment_wait_ms must not exceed budgets.enrichment_budget_ms".into(),
            ));
        }

        if self.throttle.max_interventions_per_day == 0 {
            return Err(ConfigError::ValidationError(
                "throttle.max_interventions_per_day must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.inference.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
