//! Error policy — decides which inference failures reach the caller.
//!
//! Rate limits, network trouble and 5xx responses are surfaced as a typed
//! [`MediationError`] so the host can back off and retry. Everything else
//! fails open: the message is delivered unmediated.

use calmwire_core::error::{InferenceError, MediationError};

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    Network,
    ServerError,
    ClientError,
    Unknown,
}

impl ErrorCategory {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Network | Self::ServerError)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimit => "RATE_LIMIT",
            Self::Network => "NETWORK",
            Self::ServerError => "SERVER_ERROR",
            Self::ClientError => "CLIENT_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(error: &InferenceError) -> ErrorCategory {
    match error {
        InferenceError::RateLimited { .. } => ErrorCategory::RateLimit,
        InferenceError::ApiError { status_code: 429, .. } => ErrorCategory::RateLimit,
        InferenceError::Timeout(_) | InferenceError::Network(_) => ErrorCategory::Network,
        InferenceError::ApiError { status_code, .. } if *status_code >= 500 => {
            ErrorCategory::ServerError
        }
        InferenceError::ApiError { status_code, .. } if (400..500).contains(status_code) => {
            ErrorCategory::ClientError
        }
        InferenceError::AuthenticationFailed(_) | InferenceError::ModelNotFound(_) => {
            ErrorCategory::ClientError
        }
        InferenceError::ApiError { .. }
        | InferenceError::NotConfigured(_)
        | InferenceError::InvalidResponse(_) => ErrorCategory::Unknown,
    }
}

/// The typed error to surface, or `None` when the failure should fail open.
pub fn to_mediation_error(error: &InferenceError) -> Option<MediationError> {
    match (classify(error), error) {
        (ErrorCategory::RateLimit, InferenceError::RateLimited { retry_after_secs }) => {
            Some(MediationError::RateLimited {
                retry_after_secs: *retry_after_secs,
            })
        }
        (ErrorCategory::RateLimit, _) => Some(MediationError::RateLimited {
            retry_after_secs: DEFAULT_RETRY_AFTER_SECS,
        }),
        (ErrorCategory::Network, e) => Some(MediationError::Network(e.to_string())),
        (
            ErrorCategory::ServerError,
            InferenceError::ApiError {
                status_code,
                message,
            },
        ) => Some(MediationError::ServerError {
            status_code: *status_code,
            message: message.clone(),
        }),
        _ => None,
    }
}
