//! Review routes.
//!
//! Anyone may read. Writing needs `ReviewGames`; the author of a review is
//! always the token subject. Editing or deleting someone else's review
//! needs `ModerateContent`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use game_review_core::{Capability, ReviewId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{RequireAuth, ensure, ensure_owner_or};
use crate::models::{NewReview, Review, ReviewUpdate};
use crate::state::AppState;

/// GET /api/reviews
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.catalog().list_reviews().await?))
}

/// POST /api/reviews
///
/// # Errors
///
/// 422 for a rating outside 1-10 or a game/author that does not exist.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(body): Json<NewReview>,
) -> Result<(StatusCode, Json<Review>)> {
    ensure(&identity, Capability::ReviewGames)?;
    let review = state.catalog().create_review(identity.user_id, body).await?;

    let game_id = review.game_id.to_string();
    add_breadcrumb("catalog", "Review created", Some(&[("game_id", game_id.as_str())]));
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/reviews/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<Json<Review>> {
    Ok(Json(state.catalog().get_review(id).await?))
}

/// PUT /api/reviews/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<ReviewId>,
    Json(body): Json<ReviewUpdate>,
) -> Result<Json<Review>> {
    let existing = state.catalog().get_review(id).await?;
    ensure_owner_or(&identity, existing.user_id, Capability::ModerateContent)?;
    Ok(Json(state.catalog().update_review(id, body).await?))
}

/// DELETE /api/reviews/{id}
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    let existing = state.catalog().get_review(id).await?;
    ensure_owner_or(&identity, existing.user_id, Capability::ModerateContent)?;
    state.catalog().delete_review(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
