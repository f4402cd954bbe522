//! Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use game_review_core::{GameId, Rating, ReviewId, UserId, ValidationError, optional_text};

pub const COMMENT_MAX: usize = 2000;

/// A stored review. `game_id` and `user_id` are plain references resolved by
/// lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub rating: Rating,
    pub comment: String,
    pub game_id: GameId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client input for a new review. The author comes from the bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub game_id: GameId,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewReview {
    /// # Errors
    ///
    /// Rating outside 1..=10 or an overlong comment.
    pub fn validate(self, author: UserId) -> Result<ReviewDraft, ValidationError> {
        let rating = Rating::new(self.rating)?;
        let comment = optional_text(
            "comment",
            self.comment.as_deref().unwrap_or_default(),
            COMMENT_MAX,
        )?;
        Ok(ReviewDraft {
            rating,
            comment,
            game_id: self.game_id,
            user_id: author,
        })
    }
}

/// A validated review ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: Rating,
    pub comment: String,
    pub game_id: GameId,
    pub user_id: UserId,
}

/// Client request to change a review. Absent fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

impl ReviewUpdate {
    /// # Errors
    ///
    /// Rating outside 1..=10 or an overlong comment.
    pub fn validate(self) -> Result<ReviewChanges, ValidationError> {
        Ok(ReviewChanges {
            rating: self.rating.map(Rating::new).transpose()?,
            comment: self
                .comment
                .map(|c| optional_text("comment", &c, COMMENT_MAX))
                .transpose()?,
        })
    }
}

/// Validated review changes handed to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewChanges {
    pub rating: Option<Rating>,
    pub comment: Option<String>,
}

impl ReviewChanges {
    pub fn apply_to(self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(comment) = self.comment {
            review.comment = comment;
        }
    }
}

/// Store-side selection of reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilter {
    pub game_id: Option<GameId>,
    pub user_id: Option<UserId>,
}

impl ReviewFilter {
    #[must_use]
    pub const fn for_game(game_id: GameId) -> Self {
        Self {
            game_id: Some(game_id),
            user_id: None,
        }
    }

    #[must_use]
    pub const fn by_user(user_id: UserId) -> Self {
        Self {
            game_id: None,
            user_id: Some(user_id),
        }
    }

    #[must_use]
    pub fn matches(&self, review: &Review) -> bool {
        self.game_id.is_none_or(|id| review.game_id == id)
            && self.user_id.is_none_or(|id| review.user_id == id)
    }
}
