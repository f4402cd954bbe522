//! In-process implementation of the repository ports.
//!
//! All three tables sit behind a single `RwLock`, so every write (including
//! the uniqueness check, the reference check and the cascades) happens in one
//! critical section. The lock is never held across an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use game_review_core::{Email, GameId, RatingSummary, ReviewId, UserId, Username};

use super::{
    CatalogRepository, ReferenceTarget, RepositoryError, USERNAME_CONFLICT, UserRepository,
};
use crate::models::{
    Game, GameDraft, GameFilter, NewUser, Review, ReviewChanges, ReviewDraft, ReviewFilter, User,
    UserChanges,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    games: BTreeMap<GameId, Game>,
    reviews: BTreeMap<ReviewId, Review>,
    last_user_id: i32,
    last_game_id: i32,
    last_review_id: i32,
}

fn next_id(last: &mut i32) -> Result<i32, RepositoryError> {
    *last = last
        .checked_add(1)
        .ok_or_else(|| RepositoryError::DataCorruption("id sequence exhausted".to_owned()))?;
    Ok(*last)
}

/// Repository that keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, RepositoryError> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".to_owned()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, RepositoryError> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::DataCorruption("memory store lock poisoned".to_owned()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict(USERNAME_CONFLICT.to_owned()));
        }

        let id = UserId::new(next_id(&mut tables.last_user_id)?);
        let now = Utc::now();
        let record = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            roles: user.roles,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, record.clone());
        Ok(record)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| &u.username == username)
            .cloned())
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.read()?.users.values().cloned().collect())
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.write()?;
        if let Some(username) = &changes.username
            && tables
                .users
                .values()
                .any(|u| u.id != id && &u.username == username)
        {
            return Err(RepositoryError::Conflict(USERNAME_CONFLICT.to_owned()));
        }

        let user = tables.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        changes.apply_to(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        tables.users.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.reviews.retain(|_, review| review.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn insert_game(&self, game: GameDraft) -> Result<Game, RepositoryError> {
        let mut tables = self.write()?;
        let id = GameId::new(next_id(&mut tables.last_game_id)?);
        let now = Utc::now();
        let record = Game {
            id,
            title: game.title,
            platform: game.platform,
            genre: game.genre,
            status: game.status,
            created_at: now,
            updated_at: now,
        };
        tables.games.insert(id, record.clone());
        Ok(record)
    }

    async fn game_by_id(&self, id: GameId) -> Result<Option<Game>, RepositoryError> {
        Ok(self.read()?.games.get(&id).cloned())
    }

    async fn update_game(&self, id: GameId, game: GameDraft) -> Result<Game, RepositoryError> {
        let mut tables = self.write()?;
        let record = tables.games.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.title = game.title;
        record.platform = game.platform;
        record.genre = game.genre;
        record.status = game.status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_game(&self, id: GameId) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        tables.games.remove(&id).ok_or(RepositoryError::NotFound)?;
        tables.reviews.retain(|_, review| review.game_id != id);
        Ok(())
    }

    async fn query_games(&self, filter: &GameFilter) -> Result<Vec<Game>, RepositoryError> {
        Ok(self
            .read()?
            .games
            .values()
            .filter(|game| filter.matches(game))
            .cloned()
            .collect())
    }

    async fn insert_review(&self, review: ReviewDraft) -> Result<Review, RepositoryError> {
        let mut tables = self.write()?;
        if !tables.games.contains_key(&review.game_id) {
            return Err(RepositoryError::MissingReference(ReferenceTarget::Game));
        }
        if !tables.users.contains_key(&review.user_id) {
            return Err(RepositoryError::MissingReference(ReferenceTarget::User));
        }

        let id = ReviewId::new(next_id(&mut tables.last_review_id)?);
        let now = Utc::now();
        let record = Review {
            id,
            rating: review.rating,
            comment: review.comment,
            game_id: review.game_id,
            user_id: review.user_id,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.insert(id, record.clone());
        Ok(record)
    }

    async fn review_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.read()?.reviews.get(&id).cloned())
    }

    async fn update_review(
        &self,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, RepositoryError> {
        let mut tables = self.write()?;
        let review = tables.reviews.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        changes.apply_to(review);
        review.updated_at = Utc::now();
        Ok(review.clone())
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        self.write()?
            .reviews
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn query_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .read()?
            .reviews
            .values()
            .filter(|review| filter.matches(review))
            .cloned()
            .collect())
    }

    async fn rating_summaries(
        &self,
        games: &[GameId],
    ) -> Result<HashMap<GameId, RatingSummary>, RepositoryError> {
        let tables = self.read()?;
        let mut summaries: HashMap<GameId, RatingSummary> = HashMap::new();
        for review in tables.reviews.values().filter(|r| games.contains(&r.game_id)) {
            let summary = summaries.entry(review.game_id).or_default();
            summary.review_count += 1;
            summary.rating_sum += u64::from(review.rating.value());
        }
        Ok(summaries)
    }
}
