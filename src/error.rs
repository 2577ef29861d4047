//! Error types for the catalog subsystem
//!
//! A cache miss is never an error here; cache reads return `Option` and the
//! caller decides whether to go fetch. These variants cover the failures
//! that actually propagate: upstream HTTP, payload parsing, and the local
//! cache database.

use thiserror::Error;

/// Unified error type for catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to parse a JSON payload
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// HTTP error status from the upstream catalog source
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Local cache database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Upstream has no record for the requested card
    #[error("Card not found upstream: {0}")]
    CardNotFound(String),
}

/// Result alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
