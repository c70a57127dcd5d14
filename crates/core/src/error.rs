//! Error types for the calmwire domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum. Only [`MediationError`]
//! ever leaves the orchestrator; everything else is absorbed and logged.

use thiserror::Error;

/// The top-level error type for calmwire operations outside the hot path:
/// wiring, the CLI and health checks.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Mediation errors ---
    #[error("Mediation error: {0}")]
    Mediation(#[from] MediationError),

    // --- Cache errors ---
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    // --- Context errors ---
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- I/O ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures of the remote inference service.
///
/// The client only reports what happened; deciding whether a failure is
/// retryable belongs to the error policy.
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by inference service, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Inference client not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A retryable failure surfaced to the caller of `Mediator::analyze`.
///
/// The engine never retries by itself; the host decides on backoff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediationError {
    #[error("Inference rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Inference service unreachable: {0}")]
    Network(String),

    #[error("Inference service error (status {status_code}): {message}")]
    ServerError { status_code: u16, message: String },
}

impl MediationError {
    /// Stable machine-readable code for the delivery layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "AI_RATE_LIMIT",
            Self::Network(_) => "AI_NETWORK",
            Self::ServerError { .. } => "AI_SERVER_ERROR",
        }
    }

    /// Every variant is retryable; kept as a method so callers don't
    /// have to know that.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Suggested wait before retrying, when the service told us.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detector failed: {0}")]
    Failed(String),

    #[error("Detector timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Enrichment timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Enrichment inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Enrichment response malformed: {0}")]
    Malformed(String),
}

/// Failure of a profile or situational lookup.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Lookup failed for {subject}: {reason}")]
    LookupFailed { subject: String, reason: String },

    #[error("Context source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum LearningError {
    #[error("Learning sink rejected record: {0}")]
    Rejected(String),

    #[error("Learning sink unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_error_displays_correctly() {
        let err = Error::Inference(InferenceError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn source_errors_convert_into_top_level() {
        fn read() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/calmwire/config.toml")?)
        }
        assert!(matches!(read(), Err(Error::Io(_))));

        let err: Error = MediationError::Network("refused".into()).into();
        assert!(err.to_string().starts_with("Mediation error"));
    }

    #[test]
    fn detector_timeout_reports_its_budget() {
        let err = DetectorError::Timeout { timeout_ms: 500 };
        assert_eq!(err.to_string(), "Detector timed out after 500ms");
    }

    #[test]
    fn mediation_error_codes() {
        assert_eq!(
            MediationError::RateLimited { retry_after_secs: 5 }.code(),
            "AI_RATE_LIMIT"
        );
        assert_eq!(MediationError::Network("refused".into()).code(), "AI_NETWORK");
        let server = MediationError::ServerError {
            status_code: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(server.code(), "AI_SERVER_ERROR");
        assert!(server.is_retryable());
        assert_eq!(server.retry_after_secs(), None);
    }

    #[test]
    fn rate_limit_carries_retry_hint() {
        let err = MediationError::RateLimited { retry_after_secs: 12 };
        assert_eq!(err.retry_after_secs(), Some(12));
        assert!(err.to_string().contains("12s"));
    }
}
