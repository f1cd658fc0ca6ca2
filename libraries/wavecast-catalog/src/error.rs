//! Error types for the episode listing client.

use thiserror::Error;

/// Errors that can occur when talking to the listing service.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Connection could not be established or broke mid-request
    #[error("Network connection error: {0}")]
    Network(String),

    /// No response within the configured timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Service answered with a non-success status
    #[error("Failed to load episodes: {status} - {message}")]
    Api { status: u16, message: String },

    /// Body was not a shape the listing parser understands
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),

    /// Invalid listing service URL
    #[error("Invalid listing URL: {0}")]
    InvalidUrl(String),
}

impl CatalogError {
    /// Classify a transport error, reporting timeouts with the configured budget
    pub(crate) fn from_transport(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_decode() {
            Self::UnexpectedFormat(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            CatalogError::Timeout { timeout_ms: 30000 }.to_string(),
            "Request timed out after 30000ms"
        );
        assert_eq!(
            CatalogError::Api {
                status: 404,
                message: "Not Found".into()
            }
            .to_string(),
            "Failed to load episodes: 404 - Not Found"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(CatalogError::Network("reset".into()).is_transient());
        assert!(CatalogError::Timeout { timeout_ms: 10 }.is_transient());
        assert!(CatalogError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!CatalogError::Api {
            status: 404,
            message: String::new()
        }
        .is_transient());
        assert!(!CatalogError::UnexpectedFormat("number".into()).is_transient());
    }
}
