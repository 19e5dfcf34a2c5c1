use std::time::Duration;

use thiserror::Error;

use crate::route::Route;

/// HTTP statuses that are worth another attempt.
pub const RETRYABLE_STATUSES: [u16; 10] = [408, 409, 425, 429, 500, 502, 503, 504, 522, 524];

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Endpoint \"{route}\" is not configured: {reason}")]
    Configuration { route: Route, reason: String },

    #[error("{status} {status_text} from {url}: {}", display_body(.body))]
    Http {
        url: String,
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Request to {url} timed out after {}ms", .after.as_millis())]
    Timeout { url: String, after: Duration },

    #[error("Network error calling {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request to {url} was cancelled")]
    Cancelled { url: String },

    #[error("Invalid header value for {0}")]
    InvalidHeader(String),

    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unexpected response shape from {url}: {message}")]
    Decode { url: String, message: String },
}

fn display_body(body: &str) -> &str {
    if body.is_empty() {
        "no details"
    } else {
        body
    }
}

impl GatewayError {
    /// Network failures and timeouts are always retryable; HTTP failures only
    /// when the status is in [`RETRYABLE_STATUSES`].
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network { .. } | GatewayError::Timeout { .. } => true,
            GatewayError::Http { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> GatewayError {
        GatewayError::Http {
            url: "http://api.test/x".to_string(),
            status,
            status_text: String::new(),
            body: String::new(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(http(503).is_retryable());
        assert!(http(429).is_retryable());
        assert!(http(524).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(!http(501).is_retryable());
    }

    #[test]
    fn test_transport_failures_are_retryable() {
        let timeout = GatewayError::Timeout {
            url: "u".to_string(),
            after: Duration::from_millis(10),
        };
        let network = GatewayError::Network {
            url: "u".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(timeout.is_retryable());
        assert!(network.is_retryable());
    }

    #[test]
    fn test_configuration_and_cancel_are_not_retryable() {
        let config = GatewayError::Configuration {
            route: Route::ResetSources,
            reason: "no base URL".to_string(),
        };
        let cancelled = GatewayError::Cancelled { url: "u".to_string() };
        assert!(!config.is_retryable());
        assert!(!cancelled.is_retryable());
    }

    #[test]
    fn test_http_error_message_carries_status_and_body() {
        let err = GatewayError::Http {
            url: "http://api.test/news/clear".to_string(),
            status: 502,
            status_text: "Bad Gateway".to_string(),
            body: "upstream down".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("502 Bad Gateway"));
        assert!(message.contains("upstream down"));
        assert_eq!(err.status(), Some(502));
    }
}
