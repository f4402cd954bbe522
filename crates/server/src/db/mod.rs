//! Persistence ports and their implementations.
//!
//! # Tables
//!
//! - `users` - accounts owned by the credential store
//! - `games` - the catalog
//! - `reviews` - ratings, referencing `games` and `users` with
//!   `ON DELETE CASCADE`
//!
//! # Implementations
//!
//! - [`PgStore`] - `PostgreSQL` through sqlx
//! - [`MemoryStore`] - in-process tables behind one lock, used by tests and by
//!   the server when no database URL is configured
//!
//! Both honor the same guarantees: unique usernames, reference check and
//! review insert as one atomic step, and cascading deletes.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p grs-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use game_review_core::{Email, GameId, RatingSummary, ReviewId, UserId, Username};

use crate::models::{
    Game, GameDraft, GameFilter, NewUser, Review, ReviewChanges, ReviewDraft, ReviewFilter, User,
    UserChanges,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Conflict key reported when a username is already taken.
pub const USERNAME_CONFLICT: &str = "username";

/// The entity a review pointed at that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTarget {
    Game,
    User,
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Game => "game",
            Self::User => "user",
        })
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data failed validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Record not found.
    #[error("record not found")]
    NotFound,

    /// A uniqueness or check constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A review referenced a game or user that does not exist.
    #[error("referenced {0} does not exist")]
    MissingReference(ReferenceTarget),
}

/// Storage for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with `Conflict(USERNAME_CONFLICT)` when the username is taken,
    /// decided atomically by the store.
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn user_by_username(&self, username: &Username)
    -> Result<Option<User>, RepositoryError>;

    /// Lowest-id account with this email, if any.
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// All accounts ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Apply `changes`; `NotFound` for an unknown id.
    async fn update_user(&self, id: UserId, changes: UserChanges)
    -> Result<User, RepositoryError>;

    /// Remove the account and every review it authored.
    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Storage for games and reviews.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_game(&self, game: GameDraft) -> Result<Game, RepositoryError>;

    async fn game_by_id(&self, id: GameId) -> Result<Option<Game>, RepositoryError>;

    async fn update_game(&self, id: GameId, game: GameDraft) -> Result<Game, RepositoryError>;

    /// Remove the game and all of its reviews.
    async fn delete_game(&self, id: GameId) -> Result<(), RepositoryError>;

    /// Games matching `filter`, ordered by id.
    async fn query_games(&self, filter: &GameFilter) -> Result<Vec<Game>, RepositoryError>;

    /// Check that the game and the author exist and insert, as one step.
    async fn insert_review(&self, review: ReviewDraft) -> Result<Review, RepositoryError>;

    async fn review_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;

    async fn update_review(
        &self,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, RepositoryError>;

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError>;

    /// Reviews matching `filter`, ordered by id.
    async fn query_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, RepositoryError>;

    /// Review count and exact rating sum per game. Games without reviews are
    /// absent from the map.
    async fn rating_summaries(
        &self,
        games: &[GameId],
    ) -> Result<HashMap<GameId, RatingSummary>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Embedded schema migrations from `crates/server/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
