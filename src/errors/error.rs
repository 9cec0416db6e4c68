//! Error types for the catalog API client.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Main error type for the catalog API client.
///
/// Every variant carries enough context (attempt count, last status code,
/// offending item index for batch errors) to diagnose a failure without
/// re-running with extra logging. Callers are expected to match variants
/// exhaustively rather than rely on string inspection.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    /// Configuration error (invalid settings, missing required fields)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Validation error, detected before any network call
    /// (empty required field, invalid identifier format)
    #[error("Validation error: {message}")]
    Validation {
        /// Error message describing the validation issue
        message: String,
        /// The offending field, when known
        field: Option<String>,
    },

    /// Authentication failed (HTTP 401)
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message from the server
        message: String,
    },

    /// Access forbidden (HTTP 403)
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message from the server
        message: String,
    },

    /// Resource not found (HTTP 404)
    #[error("Not found: {message}")]
    NotFound {
        /// Error message from the server
        message: String,
    },

    /// Malformed request rejected by the server (HTTP 400, never retried)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from the server
        message: String,
    },

    /// Rate limited by the server (HTTP 429)
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Error message from the server
        message: String,
        /// Duration to wait before retrying, from the Retry-After header
        retry_after: Option<Duration>,
    },

    /// Server error (5xx responses)
    #[error("Server error ({status_code}): {message}")]
    Server {
        /// Error message from the server
        message: String,
        /// HTTP status code
        status_code: u16,
    },

    /// Network error (connection failed, timeout, DNS issues)
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Malformed response body that could not be decoded
    #[error("Decode error: {message}")]
    Decode {
        /// Error message describing the decode issue
        message: String,
    },

    /// A retryable failure persisted through every allowed attempt
    #[error("Retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total number of attempts made (initial call plus retries)
        attempts: u32,
        /// The failure observed on the final attempt
        #[source]
        source: Box<CatalogError>,
    },

    /// A batch run was aborted by the `stop` error policy
    #[error("Batch aborted at item {index}: {source}")]
    BatchAborted {
        /// Input index of the item whose failure aborted the batch
        index: usize,
        /// The failure that triggered the abort
        #[source]
        source: Box<CatalogError>,
    },

    /// Internal error (unexpected conditions, library bugs)
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal issue
        message: String,
    },
}

impl CatalogError {
    /// Returns true if this error is transient and worth retrying
    /// with exponential backoff.
    ///
    /// Retryable errors are rate limits (429), network faults
    /// (connect/timeout) and server errors 500, 502, 503 and 504.
    /// Everything else is fatal: retrying a 400 or a 404 cannot succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::RateLimited { .. }
                | CatalogError::Network { .. }
                | CatalogError::Server {
                    status_code: 500 | 502 | 503 | 504,
                    ..
                }
        )
    }

    /// Returns the server-provided retry-after duration, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CatalogError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Classify a non-success HTTP status into the matching error variant.
    ///
    /// `retry_after` comes from the Retry-After header when the server
    /// sent one alongside a 429.
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        match status {
            400 => CatalogError::BadRequest {
                message: body.to_string(),
            },
            401 => CatalogError::Unauthorized {
                message: body.to_string(),
            },
            403 => CatalogError::Forbidden {
                message: body.to_string(),
            },
            404 => CatalogError::NotFound {
                message: body.to_string(),
            },
            429 => CatalogError::RateLimited {
                message: body.to_string(),
                retry_after,
            },
            500..=599 => CatalogError::Server {
                message: body.to_string(),
                status_code: status,
            },
            // Remaining 4xx codes are malformed requests in some form;
            // none of them can succeed on retry.
            _ => CatalogError::BadRequest {
                message: format!("Unexpected status {}: {}", status, body),
            },
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Network {
                message: format!("Request timed out: {}", err),
            }
        } else if err.is_connect() {
            CatalogError::Network {
                message: format!("Connection failed: {}", err),
            }
        } else {
            CatalogError::Network {
                message: format!("Network error: {}", err),
            }
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode {
            message: format!("JSON decode error: {}", err),
        }
    }
}

impl From<url::ParseError> for CatalogError {
    fn from(err: url::ParseError) -> Self {
        CatalogError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(429 => true ; "rate limited")]
    #[test_case(500 => true ; "internal server error")]
    #[test_case(502 => true ; "bad gateway")]
    #[test_case(503 => true ; "service unavailable")]
    #[test_case(504 => true ; "gateway timeout")]
    #[test_case(400 => false ; "bad request")]
    #[test_case(401 => false ; "unauthorized")]
    #[test_case(403 => false ; "forbidden")]
    #[test_case(404 => false ; "not found")]
    #[test_case(409 => false ; "conflict")]
    #[test_case(422 => false ; "unprocessable entity")]
    #[test_case(501 => false ; "not implemented")]
    fn classification_by_status(status: u16) -> bool {
        CatalogError::from_status(status, "boom", None).is_retryable()
    }

    #[test]
    fn network_errors_are_retryable() {
        let err = CatalogError::Network {
            message: "connection reset".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn decode_errors_are_fatal() {
        let err: CatalogError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, CatalogError::Decode { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn retry_after_only_on_rate_limit() {
        let rate_limited = CatalogError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(30)));

        let server = CatalogError::Server {
            message: "oops".to_string(),
            status_code: 503,
        };
        assert_eq!(server.retry_after(), None);
    }

    #[test]
    fn retries_exhausted_reports_attempts() {
        let err = CatalogError::RetriesExhausted {
            attempts: 4,
            source: Box::new(CatalogError::Server {
                message: "unavailable".to_string(),
                status_code: 503,
            }),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("4 attempts"));
        assert!(rendered.contains("503"));
    }
}
