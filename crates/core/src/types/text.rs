//! Free-text field checks shared by games and reviews.

use crate::types::validation::ValidationError;

/// Trim `value` and require 1..=`max` characters.
///
/// # Errors
///
/// `Missing` when nothing but whitespace was given, `TooLong` past `max`.
pub fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Missing { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

/// Like [`required_text`] but an empty value is allowed and kept as `""`.
///
/// # Errors
///
/// `TooLong` past `max`.
pub fn optional_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("title", "  Doom  ", 100).unwrap(), "Doom");
    }

    #[test]
    fn test_required_text_rejects_blank() {
        assert_eq!(
            required_text("platform", " \t", 50),
            Err(ValidationError::Missing { field: "platform" })
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 100 two-byte characters fit a 100-character limit.
        let title = "å".repeat(100);
        assert!(required_text("title", &title, 100).is_ok());
        let title = "å".repeat(101);
        assert_eq!(
            required_text("title", &title, 100),
            Err(ValidationError::TooLong {
                field: "title",
                max: 100
            })
        );
    }

    #[test]
    fn test_optional_text_allows_empty() {
        assert_eq!(optional_text("comment", "", 2000).unwrap(), "");
        assert!(optional_text("comment", &"x".repeat(2001), 2000).is_err());
    }
}
