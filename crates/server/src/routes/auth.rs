//! Account registration, login and identity routes.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::services::{Identity, IssuedToken};
use crate::state::AppState;

/// Registration request body.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Create an account.
///
/// POST /api/auth/register
///
/// # Errors
///
/// 422 for malformed input, 409 if the username is taken.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let user = state
        .credentials()
        .register(&body.username, &body.password, &body.email)
        .await?;

    let user_id = user.id.to_string();
    add_breadcrumb("auth", "Account registered", Some(&[("user_id", user_id.as_str())]));
    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// Exchange credentials for a bearer token.
///
/// POST /api/auth/login
///
/// # Errors
///
/// 401 `Invalid credentials` for any mismatch.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<IssuedToken>> {
    let user = state
        .credentials()
        .authenticate(&body.username, &body.password)
        .await?;
    let issued = state.tokens().issue(&user)?;

    let user_id = user.id.to_string();
    add_breadcrumb("auth", "Logged in", Some(&[("user_id", user_id.as_str())]));
    tracing::info!(user_id = %user.id, expires_at = %issued.expires_at, "token issued");
    Ok(Json(issued))
}

/// The identity carried by the presented token.
///
/// GET /api/auth/me
pub async fn me(RequireAuth(identity): RequireAuth) -> Json<Identity> {
    Json(identity)
}
