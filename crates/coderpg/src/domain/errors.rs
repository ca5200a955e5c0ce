//! Domain-specific errors.

use thiserror::Error;

/// Failure of the key-value store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected store response: {0}")]
    UnexpectedShape(String),
    #[error("value encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Failure reported by the code-host collaborator, carrying its message
/// where one was available.
#[derive(Debug, Error)]
#[error("code host error: {0}")]
pub struct UpstreamError(pub String);

/// Errors surfaced by mark and browse operations.
#[derive(Debug, Error)]
pub enum MarkError {
    /// Malformed request; rejected before anything is persisted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
