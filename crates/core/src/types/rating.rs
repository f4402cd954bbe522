//! Review scores and the derived average.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::validation::ValidationError;

/// A review score, 1 to 10 inclusive.
///
/// Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    /// # Errors
    ///
    /// `OutOfRange` for anything outside `1..=10`.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(ValidationError::OutOfRange {
                field: "rating",
                min: i64::from(Self::MIN),
                max: i64::from(Self::MAX),
            })
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Arithmetic mean of `ratings`, `0.0` when empty.
    ///
    /// The sum is exact integer arithmetic followed by a single division, so
    /// the result depends only on the multiset of ratings, not their order.
    ///
    /// ```
    /// use game_review_core::Rating;
    ///
    /// let ratings = [8, 6, 10].map(|r| Rating::new(r).unwrap());
    /// assert_eq!(Rating::average(ratings), 8.0);
    /// assert_eq!(Rating::average(std::iter::empty()), 0.0);
    /// ```
    #[must_use]
    pub fn average(ratings: impl IntoIterator<Item = Self>) -> f64 {
        RatingSummary::from_ratings(ratings).average()
    }
}

impl TryFrom<i64> for Rating {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl From<Rating> for i32 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Count and exact sum of a set of ratings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub review_count: u64,
    pub rating_sum: u64,
}

impl RatingSummary {
    #[must_use]
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating>) -> Self {
        ratings
            .into_iter()
            .fold(Self::default(), |acc, rating| Self {
                review_count: acc.review_count + 1,
                rating_sum: acc.rating_sum + u64::from(rating.value()),
            })
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
    pub fn average(&self) -> f64 {
        if self.review_count == 0 {
            return 0.0;
        }
        self.rating_sum as f64 / self.review_count as f64
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&i32::from(self.0), buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(10).unwrap().value(), 10);
    }

    #[test]
    fn test_out_of_range_is_rejected_not_clamped() {
        for bad in [0, 11, -1, 256, i64::MAX] {
            assert_eq!(
                Rating::new(bad),
                Err(ValidationError::OutOfRange {
                    field: "rating",
                    min: 1,
                    max: 10
                }),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_average_of_reviews() {
        assert_eq!(Rating::average(ratings(&[8, 6, 10])), 8.0);
        assert_eq!(Rating::average(ratings(&[7, 8])), 7.5);
        assert_eq!(Rating::average(Vec::<Rating>::new()), 0.0);
    }

    #[test]
    fn test_average_ignores_order() {
        let forward = ratings(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 3]);
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(Rating::average(forward), Rating::average(backward));
    }

    #[test]
    fn test_summary_counts() {
        let summary = RatingSummary::from_ratings(ratings(&[10, 10, 1]));
        assert_eq!(summary.review_count, 3);
        assert_eq!(summary.rating_sum, 21);
        assert_eq!(summary.average(), 7.0);
        assert_eq!(RatingSummary::default().average(), 0.0);
    }

    #[test]
    fn test_serde_validates() {
        assert_eq!(serde_json::to_string(&Rating::new(9).unwrap()).unwrap(), "9");
        assert!(serde_json::from_str::<Rating>("11").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap().value(), 4);
    }
}
