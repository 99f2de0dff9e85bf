//! Provider error types.

use thiserror::Error;

/// Errors that can occur when calling a model backend.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No API key was configured for a hosted backend.
    #[error("missing API key for {0}")]
    MissingApiKey(&'static str),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The response parsed but held no reply text.
    #[error("empty response from {0}")]
    EmptyResponse(&'static str),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Map a failed send onto the transport taxonomy.
    pub fn from_send(e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }

    /// Map an error status onto the transport taxonomy.
    ///
    /// `retry_after_secs` comes from the `retry-after` header when present.
    pub fn from_status(status: u16, body: String, retry_after_secs: Option<u64>, model: &str) -> Self {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_ms: retry_after_secs.unwrap_or(5) * 1000,
            },
            401 | 403 => ProviderError::AuthenticationFailed(body),
            404 => ProviderError::ModelNotFound(model.to_string()),
            _ => ProviderError::ApiError {
                status,
                message: body,
            },
        }
    }
}

/// Read the `retry-after` header in whole seconds.
pub(crate) fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Turn a non-success response into a `ProviderError`.
pub(crate) async fn status_error(response: reqwest::Response, model: &str) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = retry_after_secs(&response);
    let body = response.text().await.unwrap_or_default();
    ProviderError::from_status(status, body, retry_after, model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ProviderError::from_status(429, String::new(), Some(2), "m"),
            ProviderError::RateLimited {
                retry_after_ms: 2000
            }
        ));
        assert!(matches!(
            ProviderError::from_status(429, String::new(), None, "m"),
            ProviderError::RateLimited {
                retry_after_ms: 5000
            }
        ));
        assert!(matches!(
            ProviderError::from_status(401, "bad key".into(), None, "m"),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            ProviderError::from_status(404, String::new(), None, "m"),
            ProviderError::ModelNotFound(_)
        ));

        let err = ProviderError::from_status(500, "boom".into(), None, "m");
        assert_eq!(err.to_string(), "API error (HTTP 500): boom");
    }
}
