//! Field-level validation failures.

use crate::types::email::EmailError;

/// A single rejected input field.
///
/// Every service reports shape problems with this type before touching
/// persistence, so the transport can map all of them to one status code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    #[error("{field} contains characters that are not allowed")]
    InvalidCharacters { field: &'static str },

    #[error("{field} has unknown value `{value}`")]
    UnknownValue { field: &'static str, value: String },

    #[error(transparent)]
    Email(#[from] EmailError),
}

impl ValidationError {
    /// Name of the offending field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Missing { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::InvalidCharacters { field }
            | Self::UnknownValue { field, .. } => field,
            Self::Email(_) => "email",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_field() {
        let err = ValidationError::TooLong {
            field: "title",
            max: 100,
        };
        assert_eq!(err.to_string(), "title must be at most 100 characters");
        assert_eq!(err.field(), "title");

        let err = ValidationError::OutOfRange {
            field: "rating",
            min: 1,
            max: 10,
        };
        assert_eq!(err.to_string(), "rating must be between 1 and 10");
    }

    #[test]
    fn test_email_errors_are_transparent() {
        let err = ValidationError::from(EmailError::Malformed);
        assert_eq!(err.field(), "email");
        assert_eq!(err.to_string(), EmailError::Malformed.to_string());
    }
}
