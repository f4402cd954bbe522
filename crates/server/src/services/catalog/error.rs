//! Catalog error types.

use std::fmt;

use thiserror::Error;

use game_review_core::ValidationError;

use crate::db::{ReferenceTarget, RepositoryError};

/// Kinds of catalog records, for `NotFound` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Game,
    Review,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Game => "game",
            Self::Review => "review",
        })
    }
}

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input rejected before any persistence call.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(Resource),

    /// A review pointed at a game or user that does not exist.
    #[error("referenced {0} does not exist")]
    ReferenceViolation(ReferenceTarget),

    /// A store constraint rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl CatalogError {
    /// Map a repository failure, naming `resource` if it was not found.
    pub(crate) fn from_repository(resource: Resource) -> impl FnOnce(RepositoryError) -> Self {
        move |err| match err {
            RepositoryError::NotFound => Self::NotFound(resource),
            RepositoryError::MissingReference(target) => Self::ReferenceViolation(target),
            RepositoryError::Conflict(key) => Self::ConstraintViolation(key),
            other => Self::Repository(other),
        }
    }
}
