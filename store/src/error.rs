use thiserror::Error;

/// Errors from persistence and caching.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store: backend error: {0}")]
    Backend(String),

    #[error("store: serialization error: {0}")]
    Serialization(String),

    #[error("store: not found: {0}")]
    NotFound(String),

    #[error("store: invalid policy: {0}")]
    InvalidPolicy(String),
}
