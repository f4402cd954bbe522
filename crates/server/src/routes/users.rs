//! Account management routes.

use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use game_review_core::{Capability, Role, UserId, ValidationError};

use crate::error::Result;
use crate::middleware::{RequireAuth, ensure, ensure_owner_or};
use crate::models::{Review, UserProfile, UserUpdate};
use crate::services::AuthError;
use crate::state::AppState;

/// Body of `PUT /api/users/{id}/roles`.
#[derive(Debug, Deserialize)]
pub struct RolesRequest {
    pub roles: BTreeSet<Role>,
}

/// GET /api/users
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<Vec<UserProfile>>> {
    ensure(&identity, Capability::ManageUsers)?;
    let users = state.credentials().list().await?;
    Ok(Json(users.iter().map(UserProfile::from).collect()))
}

/// GET /api/users/{id}
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_identity): RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Json<UserProfile>> {
    let user = state.credentials().get(id).await?;
    Ok(Json(user.profile()))
}

/// PUT /api/users/{id}
///
/// Changes username, email or password. Tokens already issued keep the
/// claims they were signed with.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<UserId>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<UserProfile>> {
    ensure_owner_or(&identity, id, Capability::ManageUsers)?;
    let user = state.credentials().update(id, body).await?;
    Ok(Json(user.profile()))
}

/// PUT /api/users/{id}/roles
pub async fn set_roles(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<UserId>,
    Json(body): Json<RolesRequest>,
) -> Result<Json<UserProfile>> {
    ensure(&identity, Capability::ManageUsers)?;
    if body.roles.is_empty() {
        return Err(AuthError::Validation(ValidationError::Missing { field: "roles" }).into());
    }
    let user = state.credentials().set_roles(id, body.roles).await?;
    Ok(Json(user.profile()))
}

/// DELETE /api/users/{id}
///
/// Removes the account and every review it wrote.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    ensure_owner_or(&identity, id, Capability::ManageUsers)?;
    state.credentials().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/{id}/reviews
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.catalog().reviews_by_user(id).await?))
}
