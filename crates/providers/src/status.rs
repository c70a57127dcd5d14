//! HTTP status → `InferenceError` mapping shared by every client.

use calmwire_core::error::InferenceError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::warn;

/// Fallback when a 429 carries no usable `Retry-After`.
pub(crate) const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Turn a non-200 response into an error. `body` is only read for
/// statuses that carry a useful message.
pub(crate) async fn error_for_status(provider: &str, response: reqwest::Response) -> InferenceError {
    let status = response.status().as_u16();

    match status {
        429 => InferenceError::RateLimited {
            retry_after_secs: retry_after(response.headers()),
        },
        401 | 403 => InferenceError::AuthenticationFailed(format!(
            "{provider}: invalid API key or insufficient permissions"
        )),
        404 => {
            let body = response.text().await.unwrap_or_default();
            InferenceError::ModelNotFound(body)
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!(provider, status, body_len = body.len(), "Inference service returned error");
            InferenceError::ApiError {
                status_code: status,
                message: body,
            }
        }
    }
}

/// Map a failure from sending a request or reading its body.
///
/// Builder errors (an unparseable URL) are configuration faults and must
/// not be retried; a body that arrives but does not decode is an invalid
/// response.
pub(crate) fn error_for_transport(e: reqwest::Error) -> InferenceError {
    if e.is_builder() {
        InferenceError::NotConfigured(format!("cannot build request: {e}"))
    } else if e.is_timeout() {
        InferenceError::Timeout(e.to_string())
    } else if e.is_decode() {
        InferenceError::InvalidResponse(format!("Failed to parse response: {e}"))
    } else {
        InferenceError::Network(e.to_string())
    }
}

fn retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_header_parsed() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("17"));
        assert_eq!(retry_after(&headers), 17);
    }

    #[test]
    fn retry_after_defaults_when_missing_or_http_date() {
        assert_eq!(retry_after(&HeaderMap::new()), DEFAULT_RETRY_AFTER_SECS);

        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), DEFAULT_RETRY_AFTER_SECS);
    }

    #[tokio::test]
    async fn unparseable_url_is_not_configured() {
        let e = reqwest::Client::new()
            .get("not a url/chat/completions")
            .send()
            .await
            .unwrap_err();
        let err = error_for_transport(e);
        assert!(matches!(err, InferenceError::NotConfigured(_)), "{err}");
    }
}
