//! Error types for the CRM client.

use paginate_core::PageLimitExceeded;
use thiserror::Error;

/// Result type for CRM client operations.
pub type Result<T> = std::result::Result<T, CrmError>;

/// CRM client errors.
#[derive(Debug, Error)]
pub enum CrmError {
    /// Configuration error (missing API token)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status, with the response body for diagnostics
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Response body missing an expected structural field
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Pagination never terminated
    #[error(transparent)]
    PageLimit(#[from] PageLimitExceeded),
}
