//! Login name.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::validation::ValidationError;

/// A unique login name: 3 to 32 characters of `[A-Za-z0-9_.-]`.
///
/// Comparison is exact; `Alice` and `alice` are two different accounts.
///
/// ```
/// use game_review_core::Username;
///
/// assert!(Username::parse("speedrunner_42").is_ok());
/// assert!(Username::parse("no spaces").is_err());
/// assert!(Username::parse("ab").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 32;

    /// # Errors
    ///
    /// Returns a [`ValidationError`] for blank, short, long or
    /// out-of-alphabet input.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        const FIELD: &str = "username";

        if raw.is_empty() {
            return Err(ValidationError::Missing { field: FIELD });
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            return Err(ValidationError::InvalidCharacters { field: FIELD });
        }
        // Alphabet is ASCII, so byte length equals character count here.
        if raw.len() < Self::MIN_LENGTH {
            return Err(ValidationError::TooShort {
                field: FIELD,
                min: Self::MIN_LENGTH,
            });
        }
        if raw.len() > Self::MAX_LENGTH {
            return Err(ValidationError::TooLong {
                field: FIELD,
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Username {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Username {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Username {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
