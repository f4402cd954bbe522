//! `PostgreSQL` implementation of the repository ports.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database. Rows are converted into domain records
//! through the core types, so anything the database holds that those types
//! reject surfaces as `DataCorruption`.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use game_review_core::{
    Email, GameId, GameStatus, Rating, RatingSummary, ReviewId, Role, UserId, Username,
};

use super::{
    CatalogRepository, ReferenceTarget, RepositoryError, USERNAME_CONFLICT, UserRepository,
};
use crate::models::{
    Game, GameDraft, GameFilter, NewUser, Review, ReviewChanges, ReviewDraft, ReviewFilter, User,
    UserChanges,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, roles, created_at, updated_at";
const GAME_COLUMNS: &str = "id, title, platform, genre, status, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, rating, comment, game_id, user_id, created_at, updated_at";

/// Repository backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn game_exists(&self, id: GameId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM games WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    password_hash: String,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let roles = row
            .roles
            .iter()
            .map(|code| code.parse::<Role>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid role in database: {e}"))
            })?;

        Ok(Self {
            id: row.id,
            username,
            email,
            password_hash: row.password_hash,
            roles,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: GameId,
    title: String,
    platform: String,
    genre: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GameRow> for Game {
    type Error = RepositoryError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<GameStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid status in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            title: row.title,
            platform: row.platform,
            genre: row.genre,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    rating: i32,
    comment: String,
    game_id: GameId,
    user_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid rating in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            rating,
            comment: row.comment,
            game_id: row.game_id,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    game_id: GameId,
    review_count: i64,
    rating_sum: i64,
}

fn role_codes(roles: &BTreeSet<Role>) -> Vec<String> {
    roles.iter().map(|role| role.code().to_owned()).collect()
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, RepositoryError>
where
    T: TryFrom<R, Error = RepositoryError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Translate constraint failures into the repository's vocabulary.
fn classify(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = error {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_username_key") => {
                    RepositoryError::Conflict(USERNAME_CONFLICT.to_owned())
                }
                other => RepositoryError::Conflict(other.unwrap_or("unique").to_owned()),
            };
        }
        if db_err.is_foreign_key_violation() {
            return match db_err.constraint() {
                Some("reviews_user_id_fkey") => {
                    RepositoryError::MissingReference(ReferenceTarget::User)
                }
                _ => RepositoryError::MissingReference(ReferenceTarget::Game),
            };
        }
        if db_err.is_check_violation() {
            return RepositoryError::Conflict(
                db_err.constraint().unwrap_or("check").to_owned(),
            );
        }
    }
    RepositoryError::Database(error)
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (username, email, password_hash, roles) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(role_codes(&user.roles))
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        row.try_into()
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    async fn user_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 ORDER BY id LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;

        collect(rows)
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET \
                 username = COALESCE($2, username), \
                 email = COALESCE($3, email), \
                 password_hash = COALESCE($4, password_hash), \
                 roles = COALESCE($5, roles), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.roles.as_ref().map(role_codes))
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RepositoryError> {
        // reviews.user_id cascades
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl CatalogRepository for PgStore {
    async fn insert_game(&self, game: GameDraft) -> Result<Game, RepositoryError> {
        let row: GameRow = sqlx::query_as(&format!(
            "INSERT INTO games (title, platform, genre, status) \
             VALUES ($1, $2, $3, $4) RETURNING {GAME_COLUMNS}"
        ))
        .bind(&game.title)
        .bind(&game.platform)
        .bind(&game.genre)
        .bind(game.status)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        row.try_into()
    }

    async fn game_by_id(&self, id: GameId) -> Result<Option<Game>, RepositoryError> {
        let row: Option<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Game::try_from).transpose()
    }

    async fn update_game(&self, id: GameId, game: GameDraft) -> Result<Game, RepositoryError> {
        let row: Option<GameRow> = sqlx::query_as(&format!(
            "UPDATE games SET title = $2, platform = $3, genre = $4, status = $5, \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {GAME_COLUMNS}"
        ))
        .bind(id)
        .bind(&game.title)
        .bind(&game.platform)
        .bind(&game.genre)
        .bind(game.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete_game(&self, id: GameId) -> Result<(), RepositoryError> {
        // reviews.game_id cascades
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn query_games(&self, filter: &GameFilter) -> Result<Vec<Game>, RepositoryError> {
        let statuses: Vec<&str> = filter.statuses.iter().map(|s| s.code()).collect();

        let rows: Vec<GameRow> = sqlx::query_as(&format!(
            "SELECT {GAME_COLUMNS} FROM games \
             WHERE ($1::TEXT IS NULL OR genre = $1) \
               AND (cardinality($2::TEXT[]) = 0 OR status = ANY($2)) \
               AND ($3::TEXT IS NULL OR strpos(lower(title), lower($3)) > 0) \
             ORDER BY id"
        ))
        .bind(filter.genre.as_deref())
        .bind(statuses)
        .bind(filter.title_contains.as_deref())
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn insert_review(&self, review: ReviewDraft) -> Result<Review, RepositoryError> {
        // One statement: the row is only produced when both targets exist, and
        // the foreign keys catch a concurrent delete.
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            "INSERT INTO reviews (rating, comment, game_id, user_id) \
             SELECT $1, $2, g.id, u.id FROM games g CROSS JOIN users u \
             WHERE g.id = $3 AND u.id = $4 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.game_id)
        .bind(review.user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        let Some(row) = row else {
            let target = if self.game_exists(review.game_id).await? {
                ReferenceTarget::User
            } else {
                ReferenceTarget::Game
            };
            return Err(RepositoryError::MissingReference(target));
        };
        row.try_into()
    }

    async fn review_by_id(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row: Option<ReviewRow> =
            sqlx::query_as(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Review::try_from).transpose()
    }

    async fn update_review(
        &self,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, RepositoryError> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            "UPDATE reviews SET \
                 rating = COALESCE($2, rating), \
                 comment = COALESCE($3, comment), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.rating)
        .bind(changes.comment)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    async fn delete_review(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn query_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews \
             WHERE ($1::INTEGER IS NULL OR game_id = $1) \
               AND ($2::INTEGER IS NULL OR user_id = $2) \
             ORDER BY id"
        ))
        .bind(filter.game_id)
        .bind(filter.user_id)
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    async fn rating_summaries(
        &self,
        games: &[GameId],
    ) -> Result<HashMap<GameId, RatingSummary>, RepositoryError> {
        if games.is_empty() {
            return Ok(HashMap::new());
        }
        let ids: Vec<i32> = games.iter().map(GameId::as_i32).collect();

        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT game_id, COUNT(*)::BIGINT AS review_count, \
                    COALESCE(SUM(rating), 0)::BIGINT AS rating_sum \
             FROM reviews WHERE game_id = ANY($1) GROUP BY game_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let review_count = u64::try_from(row.review_count).map_err(|_| {
                    RepositoryError::DataCorruption("negative review count".to_owned())
                })?;
                let rating_sum = u64::try_from(row.rating_sum).map_err(|_| {
                    RepositoryError::DataCorruption("negative rating sum".to_owned())
                })?;
                Ok((
                    row.game_id,
                    RatingSummary {
                        review_count,
                        rating_sum,
                    },
                ))
            })
            .collect()
    }
}
