//! Credential store error types.

use thiserror::Error;

use game_review_core::{EmailError, ValidationError};

use crate::db::{RepositoryError, USERNAME_CONFLICT};

/// Errors that can occur during credential operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Input rejected before any persistence call.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The username belongs to another account.
    #[error("username is already taken")]
    DuplicateUsername,

    /// Unknown username or wrong password. Deliberately says which of the two
    /// it was to nobody.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account with that id.
    #[error("user not found")]
    NotFound,

    /// A store constraint other than username uniqueness rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl From<EmailError> for AuthError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.into())
    }
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(key) if key == USERNAME_CONFLICT => Self::DuplicateUsername,
            RepositoryError::Conflict(key) => Self::ConstraintViolation(key),
            other => Self::Repository(other),
        }
    }
}
