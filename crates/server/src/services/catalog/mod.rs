//! Catalog aggregator.
//!
//! Owns games and reviews. Reviews reference games and users by id only;
//! the store checks those references atomically on insert. Average ratings
//! are never stored: every view recomputes them from the current reviews.

mod error;

pub use error::{CatalogError, Resource};

use std::sync::Arc;

use rand::seq::IndexedRandom;

use game_review_core::{GameId, GameStatus, RatingSummary, ReviewId, SortDirection, UserId};

use crate::db::CatalogRepository;
use crate::models::{
    Game, GameFilter, GameView, NewGame, NewReview, Review, ReviewFilter, ReviewUpdate,
    SearchQuery,
};

/// Statuses `random_game` draws from when the caller names none.
pub const DEFAULT_RANDOM_STATUSES: &[GameStatus] = &[GameStatus::Backlog];

/// Order games by title bytes, ties by ascending id.
///
/// `Desc` reverses the title order only; equal titles stay in id order so the
/// result is a total order either way.
pub fn sort_by_title(games: &mut [Game], direction: SortDirection) {
    games.sort_by(|a, b| {
        let by_title = a.title.as_bytes().cmp(b.title.as_bytes());
        let by_title = match direction {
            SortDirection::Asc => by_title,
            SortDirection::Desc => by_title.reverse(),
        };
        by_title.then_with(|| a.id.cmp(&b.id))
    });
}

/// Game and review operations over a [`CatalogRepository`].
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    async fn require_game(&self, id: GameId) -> Result<Game, CatalogError> {
        self.catalog
            .game_by_id(id)
            .await
            .map_err(CatalogError::from_repository(Resource::Game))?
            .ok_or(CatalogError::NotFound(Resource::Game))
    }

    async fn view(&self, game: Game) -> Result<GameView, CatalogError> {
        let summary = self.rating_summary_unchecked(game.id).await?;
        Ok(GameView::new(game, summary))
    }

    async fn views(&self, games: Vec<Game>) -> Result<Vec<GameView>, CatalogError> {
        let ids: Vec<GameId> = games.iter().map(|game| game.id).collect();
        let summaries = self
            .catalog
            .rating_summaries(&ids)
            .await
            .map_err(CatalogError::from_repository(Resource::Game))?;

        Ok(games
            .into_iter()
            .map(|game| {
                let summary = summaries.get(&game.id).copied().unwrap_or_default();
                GameView::new(game, summary)
            })
            .collect())
    }

    async fn query(&self, filter: &GameFilter) -> Result<Vec<Game>, CatalogError> {
        self.catalog
            .query_games(filter)
            .await
            .map_err(CatalogError::from_repository(Resource::Game))
    }

    async fn rating_summary_unchecked(&self, id: GameId) -> Result<RatingSummary, CatalogError> {
        let summaries = self
            .catalog
            .rating_summaries(&[id])
            .await
            .map_err(CatalogError::from_repository(Resource::Game))?;
        Ok(summaries.get(&id).copied().unwrap_or_default())
    }

    // =========================================================================
    // Games
    // =========================================================================

    /// Add a game. Status defaults to `Backlog`.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed input.
    pub async fn create_game(&self, input: NewGame) -> Result<GameView, CatalogError> {
        let draft = input.validate(GameStatus::default())?;
        let game = self
            .catalog
            .insert_game(draft)
            .await
            .map_err(CatalogError::from_repository(Resource::Game))?;

        tracing::info!(game_id = %game.id, title = %game.title, "game created");
        Ok(GameView::new(game, RatingSummary::default()))
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn get_game(&self, id: GameId) -> Result<GameView, CatalogError> {
        let game = self.require_game(id).await?;
        self.view(game).await
    }

    /// Replace a game's fields. An absent status keeps the current one.
    ///
    /// # Errors
    ///
    /// `Validation` or `NotFound`.
    pub async fn update_game(&self, id: GameId, input: NewGame) -> Result<GameView, CatalogError> {
        let current = self.require_game(id).await?;
        let draft = input.validate(current.status)?;
        let game = self
            .catalog
            .update_game(id, draft)
            .await
            .map_err(CatalogError::from_repository(Resource::Game))?;

        tracing::info!(game_id = %game.id, "game updated");
        self.view(game).await
    }

    /// Remove a game and its reviews.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn delete_game(&self, id: GameId) -> Result<(), CatalogError> {
        self.catalog
            .delete_game(id)
            .await
            .map_err(CatalogError::from_repository(Resource::Game))?;
        tracing::info!(game_id = %id, "game deleted");
        Ok(())
    }

    /// All games in id order.
    ///
    /// # Errors
    ///
    /// Repository failures only.
    pub async fn list_games(&self) -> Result<Vec<GameView>, CatalogError> {
        let games = self.query(&GameFilter::default()).await?;
        self.views(games).await
    }

    /// Games whose genre equals `genre` exactly.
    ///
    /// # Errors
    ///
    /// Repository failures only.
    pub async fn games_by_genre(&self, genre: &str) -> Result<Vec<GameView>, CatalogError> {
        let filter = GameFilter {
            genre: Some(genre.to_owned()),
            ..GameFilter::default()
        };
        let games = self.query(&filter).await?;
        self.views(games).await
    }

    /// # Errors
    ///
    /// Repository failures only.
    pub async fn games_by_status(&self, status: GameStatus) -> Result<Vec<GameView>, CatalogError> {
        let filter = GameFilter {
            statuses: vec![status],
            ..GameFilter::default()
        };
        let games = self.query(&filter).await?;
        self.views(games).await
    }

    /// Uniform pick among games in any of `statuses`.
    ///
    /// An empty slice means [`DEFAULT_RANDOM_STATUSES`].
    ///
    /// # Errors
    ///
    /// `NotFound(Game)` when no game qualifies.
    pub async fn random_game(&self, statuses: &[GameStatus]) -> Result<GameView, CatalogError> {
        let statuses = if statuses.is_empty() {
            DEFAULT_RANDOM_STATUSES
        } else {
            statuses
        };
        let filter = GameFilter {
            statuses: statuses.to_vec(),
            ..GameFilter::default()
        };
        let candidates = self.query(&filter).await?;

        let game = candidates
            .choose(&mut rand::rng())
            .cloned()
            .ok_or(CatalogError::NotFound(Resource::Game))?;
        self.view(game).await
    }

    /// Case-insensitive title search.
    ///
    /// A missing or blank filter matches every game.
    ///
    /// # Errors
    ///
    /// Repository failures only.
    pub async fn search(&self, query: SearchQuery) -> Result<Vec<GameView>, CatalogError> {
        let needle = query
            .filter
            .map(|f| f.trim().to_owned())
            .filter(|f| !f.is_empty());
        let filter = GameFilter {
            title_contains: needle,
            ..GameFilter::default()
        };
        let mut games = self.query(&filter).await?;
        sort_by_title(&mut games, query.sort.unwrap_or_default());
        self.views(games).await
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Record a review by `author`.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad rating or comment, `ReferenceViolation` when
    /// the game or the author does not exist.
    pub async fn create_review(
        &self,
        author: UserId,
        input: NewReview,
    ) -> Result<Review, CatalogError> {
        let draft = input.validate(author)?;
        let review = self
            .catalog
            .insert_review(draft)
            .await
            .map_err(CatalogError::from_repository(Resource::Review))?;

        tracing::info!(
            review_id = %review.id,
            game_id = %review.game_id,
            user_id = %review.user_id,
            rating = %review.rating,
            "review created"
        );
        Ok(review)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn get_review(&self, id: ReviewId) -> Result<Review, CatalogError> {
        self.catalog
            .review_by_id(id)
            .await
            .map_err(CatalogError::from_repository(Resource::Review))?
            .ok_or(CatalogError::NotFound(Resource::Review))
    }

    /// # Errors
    ///
    /// `NotFound(Game)` when the game does not exist.
    pub async fn reviews_for_game(&self, game_id: GameId) -> Result<Vec<Review>, CatalogError> {
        self.require_game(game_id).await?;
        self.catalog
            .query_reviews(&ReviewFilter::for_game(game_id))
            .await
            .map_err(CatalogError::from_repository(Resource::Review))
    }

    /// Reviews written by `user_id`; empty for an unknown user.
    ///
    /// # Errors
    ///
    /// Repository failures only.
    pub async fn reviews_by_user(&self, user_id: UserId) -> Result<Vec<Review>, CatalogError> {
        self.catalog
            .query_reviews(&ReviewFilter::by_user(user_id))
            .await
            .map_err(CatalogError::from_repository(Resource::Review))
    }

    /// # Errors
    ///
    /// Repository failures only.
    pub async fn list_reviews(&self) -> Result<Vec<Review>, CatalogError> {
        self.catalog
            .query_reviews(&ReviewFilter::default())
            .await
            .map_err(CatalogError::from_repository(Resource::Review))
    }

    /// # Errors
    ///
    /// `Validation` or `NotFound`.
    pub async fn update_review(
        &self,
        id: ReviewId,
        update: ReviewUpdate,
    ) -> Result<Review, CatalogError> {
        let changes = update.validate()?;
        let review = self
            .catalog
            .update_review(id, changes)
            .await
            .map_err(CatalogError::from_repository(Resource::Review))?;

        tracing::info!(review_id = %review.id, "review updated");
        Ok(review)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn delete_review(&self, id: ReviewId) -> Result<(), CatalogError> {
        self.catalog
            .delete_review(id)
            .await
            .map_err(CatalogError::from_repository(Resource::Review))?;
        tracing::info!(review_id = %id, "review deleted");
        Ok(())
    }

    // =========================================================================
    // Ratings
    // =========================================================================

    /// Review count and rating sum for one game.
    ///
    /// # Errors
    ///
    /// `NotFound(Game)` when the game does not exist.
    pub async fn rating_summary(&self, game_id: GameId) -> Result<RatingSummary, CatalogError> {
        self.require_game(game_id).await?;
        self.rating_summary_unchecked(game_id).await
    }

    /// Mean rating of a game, `0.0` without reviews.
    ///
    /// # Errors
    ///
    /// `NotFound(Game)` when the game does not exist.
    pub async fn average_rating(&self, game_id: GameId) -> Result<f64, CatalogError> {
        Ok(self.rating_summary(game_id).await?.average())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use game_review_core::{Email, Role, Username};

    use super::*;
    use crate::db::{MemoryStore, ReferenceTarget, UserRepository};
    use crate::models::NewUser;

    struct Fixture {
        store: Arc<MemoryStore>,
        catalog: CatalogService,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let catalog = CatalogService::new(store.clone());
            Self { store, catalog }
        }

        async fn user(&self, name: &str) -> UserId {
            self.store
                .insert_user(NewUser {
                    username: Username::parse(name).unwrap(),
                    email: Email::parse(&format!("{name}@example.com")).unwrap(),
                    password_hash: "hash".to_owned(),
                    roles: BTreeSet::from([Role::Member]),
                })
                .await
                .unwrap()
                .id
        }

        async fn game(&self, title: &str, status: &str) -> GameId {
            self.catalog
                .create_game(NewGame {
                    title: title.to_owned(),
                    platform: "PC".to_owned(),
                    genre: "Strategy".to_owned(),
                    status: Some(status.to_owned()),
                })
                .await
                .unwrap()
                .game
                .id
        }

        async fn review(&self, game_id: GameId, author: UserId, rating: i64) -> Review {
            self.catalog
                .create_review(
                    author,
                    NewReview {
                        game_id,
                        rating,
                        comment: None,
                    },
                )
                .await
                .unwrap()
        }
    }

    fn titles(views: &[GameView]) -> Vec<&str> {
        views.iter().map(|v| v.game.title.as_str()).collect()
    }

    fn bare_game(id: i32, title: &str) -> Game {
        Game {
            id: GameId::new(id),
            title: title.to_owned(),
            platform: "PC".to_owned(),
            genre: "RPG".to_owned(),
            status: GameStatus::Backlog,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_sort_is_bytewise_with_id_ties() {
        let mut games = vec![
            bare_game(3, "beta"),
            bare_game(1, "Beta"),
            bare_game(2, "alpha"),
            bare_game(4, "Beta"),
        ];
        sort_by_title(&mut games, SortDirection::Asc);
        let order: Vec<i32> = games.iter().map(|g| g.id.as_i32()).collect();
        // Uppercase sorts before lowercase.
        assert_eq!(order, vec![1, 4, 2, 3]);

        sort_by_title(&mut games, SortDirection::Desc);
        let order: Vec<i32> = games.iter().map(|g| g.id.as_i32()).collect();
        assert_eq!(order, vec![3, 2, 1, 4]);
    }

    #[tokio::test]
    async fn test_average_rating() {
        let fx = Fixture::new();
        let author = fx.user("critic").await;
        let game = fx.game("Factorio", "backlog").await;

        assert_eq!(fx.catalog.average_rating(game).await.unwrap(), 0.0);
        assert_eq!(fx.catalog.get_game(game).await.unwrap().average_rating, 0.0);

        for rating in [8, 6, 10] {
            fx.review(game, author, rating).await;
        }
        assert_eq!(fx.catalog.average_rating(game).await.unwrap(), 8.0);

        let view = fx.catalog.get_game(game).await.unwrap();
        assert_eq!(view.average_rating, 8.0);
        assert_eq!(view.review_count, 3);

        assert!(matches!(
            fx.catalog.average_rating(GameId::new(999)).await,
            Err(CatalogError::NotFound(Resource::Game))
        ));
    }

    #[tokio::test]
    async fn test_rating_bounds() {
        let fx = Fixture::new();
        let author = fx.user("critic").await;
        let game = fx.game("Civilization", "done").await;

        for bad in [0, 11] {
            let result = fx
                .catalog
                .create_review(
                    author,
                    NewReview {
                        game_id: game,
                        rating: bad,
                        comment: None,
                    },
                )
                .await;
            assert!(matches!(result, Err(CatalogError::Validation(_))), "{bad}");
        }
        fx.review(game, author, 1).await;
        fx.review(game, author, 10).await;
        assert_eq!(fx.catalog.reviews_for_game(game).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reference_violations_persist_nothing() {
        let fx = Fixture::new();
        let author = fx.user("critic").await;
        let game = fx.game("Stellaris", "backlog").await;

        let missing_game = fx
            .catalog
            .create_review(
                author,
                NewReview {
                    game_id: GameId::new(404),
                    rating: 5,
                    comment: None,
                },
            )
            .await;
        assert!(matches!(
            missing_game,
            Err(CatalogError::ReferenceViolation(ReferenceTarget::Game))
        ));

        let missing_user = fx
            .catalog
            .create_review(
                UserId::new(404),
                NewReview {
                    game_id: game,
                    rating: 5,
                    comment: None,
                },
            )
            .await;
        assert!(matches!(
            missing_user,
            Err(CatalogError::ReferenceViolation(ReferenceTarget::User))
        ));

        assert!(fx.catalog.list_reviews().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search() {
        let fx = Fixture::new();
        for title in ["Warcraft", "Minecraft", "Starwars"] {
            fx.game(title, "backlog").await;
        }

        let desc = fx
            .catalog
            .search(SearchQuery {
                filter: Some("War".to_owned()),
                sort: Some(SortDirection::Desc),
            })
            .await
            .unwrap();
        assert_eq!(titles(&desc), vec!["Warcraft", "Starwars"]);

        let asc = fx
            .catalog
            .search(SearchQuery {
                filter: Some("war".to_owned()),
                sort: None,
            })
            .await
            .unwrap();
        assert_eq!(titles(&asc), vec!["Starwars", "Warcraft"]);

        let everything = fx.catalog.search(SearchQuery::default()).await.unwrap();
        assert_eq!(titles(&everything), vec!["Minecraft", "Starwars", "Warcraft"]);
    }

    #[tokio::test]
    async fn test_random_game() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.catalog.random_game(&[]).await,
            Err(CatalogError::NotFound(Resource::Game))
        ));

        let playing = fx.game("Into the Breach", "in_progress").await;
        assert!(
            fx.catalog.random_game(&[]).await.is_err(),
            "default draws from the backlog only"
        );

        let picked = fx
            .catalog
            .random_game(&[GameStatus::InProgress, GameStatus::Done])
            .await
            .unwrap();
        assert_eq!(picked.game.id, playing);

        let backlog = fx.game("FTL", "backlog").await;
        for _ in 0..10 {
            assert_eq!(fx.catalog.random_game(&[]).await.unwrap().game.id, backlog);
        }
    }

    #[tokio::test]
    async fn test_filters() {
        let fx = Fixture::new();
        fx.game("XCOM", "done").await;
        fx.game("Frostpunk", "backlog").await;

        let strategy = fx.catalog.games_by_genre("Strategy").await.unwrap();
        assert_eq!(strategy.len(), 2);
        assert!(fx.catalog.games_by_genre("strategy").await.unwrap().is_empty());

        let done = fx.catalog.games_by_status(GameStatus::Done).await.unwrap();
        assert_eq!(titles(&done), vec!["XCOM"]);
        assert_eq!(done.first().unwrap().status_label, "Klar");
    }

    #[tokio::test]
    async fn test_update_keeps_status_when_absent() {
        let fx = Fixture::new();
        let id = fx.game("Hades", "in_progress").await;

        let updated = fx
            .catalog
            .update_game(
                id,
                NewGame {
                    title: "Hades II".to_owned(),
                    platform: "PC".to_owned(),
                    genre: "Roguelike".to_owned(),
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.game.title, "Hades II");
        assert_eq!(updated.game.status, GameStatus::InProgress);

        assert!(matches!(
            fx.catalog.update_game(GameId::new(77), NewGame::default()).await,
            Err(CatalogError::NotFound(Resource::Game))
        ));
    }

    #[tokio::test]
    async fn test_deletes_cascade() {
        let fx = Fixture::new();
        let author = fx.user("critic").await;
        let other = fx.user("second").await;
        let game = fx.game("Slay the Spire", "done").await;
        let kept = fx.game("Inscryption", "done").await;

        fx.review(game, author, 9).await;
        fx.review(kept, author, 7).await;
        fx.review(kept, other, 5).await;

        fx.catalog.delete_game(game).await.unwrap();
        assert!(matches!(
            fx.catalog.reviews_for_game(game).await,
            Err(CatalogError::NotFound(Resource::Game))
        ));
        assert_eq!(fx.catalog.list_reviews().await.unwrap().len(), 2);

        fx.store.delete_user(author).await.unwrap();
        assert!(fx.catalog.reviews_by_user(author).await.unwrap().is_empty());
        assert_eq!(fx.catalog.average_rating(kept).await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn test_review_update_and_delete() {
        let fx = Fixture::new();
        let author = fx.user("critic").await;
        let game = fx.game("Celeste", "done").await;
        let review = fx.review(game, author, 4).await;

        let updated = fx
            .catalog
            .update_review(
                review.id,
                ReviewUpdate {
                    rating: Some(9),
                    comment: Some("Grew on me.".to_owned()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rating.value(), 9);
        assert_eq!(updated.comment, "Grew on me.");
        assert_eq!(fx.catalog.average_rating(game).await.unwrap(), 9.0);

        fx.catalog.delete_review(review.id).await.unwrap();
        assert!(matches!(
            fx.catalog.get_review(review.id).await,
            Err(CatalogError::NotFound(Resource::Review))
        ));
        assert!(matches!(
            fx.catalog.delete_review(review.id).await,
            Err(CatalogError::NotFound(Resource::Review))
        ));
    }
}
