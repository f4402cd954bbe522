//! Game domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use game_review_core::{
    GameId, GameStatus, RatingSummary, SortDirection, ValidationError, required_text,
};

pub const TITLE_MAX: usize = 100;
pub const PLATFORM_MAX: usize = 100;
pub const GENRE_MAX: usize = 100;

/// A stored game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub title: String,
    pub platform: String,
    pub genre: String,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A game together with its derived score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    #[serde(flatten)]
    pub game: Game,
    pub status_label: String,
    pub average_rating: f64,
    pub review_count: u64,
}

impl GameView {
    #[must_use]
    pub fn new(game: Game, summary: RatingSummary) -> Self {
        Self {
            status_label: game.status.label().to_owned(),
            average_rating: summary.average(),
            review_count: summary.review_count,
            game,
        }
    }
}

/// Client input for creating or replacing a game.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGame {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub genre: String,
    pub status: Option<String>,
}

impl NewGame {
    /// Check every field and fall back to `default_status` when none is given.
    ///
    /// # Errors
    ///
    /// The first field that fails validation.
    pub fn validate(self, default_status: GameStatus) -> Result<GameDraft, ValidationError> {
        let title = required_text("title", &self.title, TITLE_MAX)?;
        let platform = required_text("platform", &self.platform, PLATFORM_MAX)?;
        let genre = required_text("genre", &self.genre, GENRE_MAX)?;
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => default_status,
            Some(raw) => raw.parse()?,
        };
        Ok(GameDraft {
            title,
            platform,
            genre,
            status,
        })
    }
}

/// A validated game ready for the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDraft {
    pub title: String,
    pub platform: String,
    pub genre: String,
    pub status: GameStatus,
}

/// Store-side selection of games. Every present criterion must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    /// Exact genre match.
    pub genre: Option<String>,
    /// Any of these statuses; empty means any status.
    pub statuses: Vec<GameStatus>,
    /// Case-insensitive substring of the title.
    pub title_contains: Option<String>,
}

impl GameFilter {
    /// In-process evaluation, used by the memory store.
    #[must_use]
    pub fn matches(&self, game: &Game) -> bool {
        if let Some(genre) = &self.genre
            && &game.genre != genre
        {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&game.status) {
            return false;
        }
        if let Some(needle) = &self.title_contains
            && !game.title.to_lowercase().contains(&needle.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Title search parameters as they arrive from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub filter: Option<String>,
    pub sort: Option<SortDirection>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> NewGame {
        NewGame {
            title: " Hollow Knight ".to_owned(),
            platform: "PC".to_owned(),
            genre: "Metroidvania".to_owned(),
            status: None,
        }
    }

    fn game(title: &str, status: GameStatus) -> Game {
        Game {
            id: GameId::new(1),
            title: title.to_owned(),
            platform: "PC".to_owned(),
            genre: "RPG".to_owned(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_defaults_status() {
        let draft = input().validate(GameStatus::Backlog).unwrap();
        assert_eq!(draft.title, "Hollow Knight");
        assert_eq!(draft.status, GameStatus::Backlog);
    }

    #[test]
    fn test_validate_parses_label() {
        let draft = NewGame {
            status: Some("Pågående".to_owned()),
            ..input()
        }
        .validate(GameStatus::Backlog)
        .unwrap();
        assert_eq!(draft.status, GameStatus::InProgress);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let long_title = NewGame {
            title: "t".repeat(101),
            ..input()
        };
        assert_eq!(
            long_title.validate(GameStatus::Backlog),
            Err(ValidationError::TooLong {
                field: "title",
                max: 100
            })
        );

        let no_genre = NewGame {
            genre: String::new(),
            ..input()
        };
        assert_eq!(
            no_genre.validate(GameStatus::Backlog),
            Err(ValidationError::Missing { field: "genre" })
        );

        let bad_status = NewGame {
            status: Some("shelved".to_owned()),
            ..input()
        };
        assert!(matches!(
            bad_status.validate(GameStatus::Backlog),
            Err(ValidationError::UnknownValue { field: "status", .. })
        ));
    }

    #[test]
    fn test_filter_matches() {
        let filter = GameFilter {
            genre: Some("RPG".to_owned()),
            statuses: vec![GameStatus::Done],
            title_contains: Some("war".to_owned()),
        };
        assert!(filter.matches(&game("Starwars", GameStatus::Done)));
        assert!(!filter.matches(&game("Starwars", GameStatus::Backlog)));
        assert!(!filter.matches(&game("Minecraft", GameStatus::Done)));
        assert!(GameFilter::default().matches(&game("Anything", GameStatus::InProgress)));
    }

    #[test]
    fn test_view_flattens_game() {
        let view = GameView::new(
            game("Celeste", GameStatus::Done),
            RatingSummary {
                review_count: 2,
                rating_sum: 17,
            },
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "Celeste");
        assert_eq!(json["status"], "done");
        assert_eq!(json["status_label"], "Klar");
        assert_eq!(json["average_rating"], 8.5);
        assert_eq!(json["review_count"], 2);
    }
}
