//! Game catalog routes.
//!
//! Reads are public. Creating and editing games needs `CurateCatalog`,
//! deleting needs `ModerateContent`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use game_review_core::{Capability, GameId, GameStatus};

use crate::error::Result;
use crate::middleware::{RequireAuth, ensure};
use crate::models::{GameView, NewGame, Review, SearchQuery};
use crate::services::CatalogError;
use crate::state::AppState;

/// Query parameters for `/api/games/random`.
#[derive(Debug, Default, Deserialize)]
pub struct RandomQuery {
    /// Comma-separated statuses; absent means backlog.
    pub status: Option<String>,
}

/// Derived score of one game.
#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub game_id: GameId,
    pub average_rating: f64,
    pub review_count: u64,
}

/// GET /api/games
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<GameView>>> {
    Ok(Json(state.catalog().list_games().await?))
}

/// POST /api/games
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(body): Json<NewGame>,
) -> Result<(StatusCode, Json<GameView>)> {
    ensure(&identity, Capability::CurateCatalog)?;
    let game = state.catalog().create_game(body).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// GET /api/games/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<GameView>> {
    Ok(Json(state.catalog().get_game(id).await?))
}

/// PUT /api/games/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<GameId>,
    Json(body): Json<NewGame>,
) -> Result<Json<GameView>> {
    ensure(&identity, Capability::CurateCatalog)?;
    Ok(Json(state.catalog().update_game(id, body).await?))
}

/// DELETE /api/games/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<GameId>,
) -> Result<StatusCode> {
    ensure(&identity, Capability::ModerateContent)?;
    state.catalog().delete_game(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/games/search?filter=&sort=asc|desc
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<GameView>>> {
    Ok(Json(state.catalog().search(query).await?))
}

/// GET /api/games/random?status=backlog,in_progress
///
/// # Errors
///
/// 404 when no game has any of the statuses.
pub async fn random(
    State(state): State<AppState>,
    Query(query): Query<RandomQuery>,
) -> Result<Json<GameView>> {
    let statuses = match query.status.as_deref() {
        Some(raw) => GameStatus::parse_list(raw).map_err(CatalogError::from)?,
        None => Vec::new(),
    };
    Ok(Json(state.catalog().random_game(&statuses).await?))
}

/// GET /api/games/genre/{genre}
pub async fn by_genre(
    State(state): State<AppState>,
    Path(genre): Path<String>,
) -> Result<Json<Vec<GameView>>> {
    Ok(Json(state.catalog().games_by_genre(&genre).await?))
}

/// GET /api/games/status/{status}
pub async fn by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<GameView>>> {
    let status: GameStatus = status.parse().map_err(CatalogError::from)?;
    Ok(Json(state.catalog().games_by_status(status).await?))
}

/// GET /api/games/{id}/reviews
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.catalog().reviews_for_game(id).await?))
}

/// GET /api/games/{id}/rating
pub async fn rating(
    State(state): State<AppState>,
    Path(id): Path<GameId>,
) -> Result<Json<RatingResponse>> {
    let summary = state.catalog().rating_summary(id).await?;
    Ok(Json(RatingResponse {
        game_id: id,
        average_rating: summary.average(),
        review_count: summary.review_count,
    }))
}
