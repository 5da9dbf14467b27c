use thiserror::Error;

use crate::content::{AttributeError, EntityId};

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// A decorator or binding was composed over a repository that cannot
    /// honor it. Raised at composition time, never per request.
    #[error("Repository configuration error: {0}")]
    Configuration(String),
}

impl RepositoryError {
    /// Builds a `NotFound` error for an entity ID.
    pub fn not_found(entity_type: &'static str, id: EntityId) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Returns true if this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<AttributeError> for RepositoryError {
    fn from(err: AttributeError) -> Self {
        Self::InvalidData(err.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
