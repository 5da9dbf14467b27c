use thiserror::Error;

use super::SerializationError;

/// Errors that can occur during cache operations.
///
/// None of these ever reach a repository caller: the read path treats them
/// as a cache miss and the invalidation path logs them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<SerializationError> for CacheError {
    fn from(err: SerializationError) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
