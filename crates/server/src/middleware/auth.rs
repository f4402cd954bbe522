//! Bearer-token authentication extractor and capability checks.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use game_review_core::{Capability, UserId};

use crate::error::{AppError, set_sentry_user};
use crate::services::{Identity, TokenError};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// A missing header, a header in another scheme and a token that fails
/// validation are all rejected with the same `401 Invalid token`.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireAuth(identity): RequireAuth) -> Json<Identity> {
///     Json(identity)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(TokenError::Invalid)?;

        let identity = state.tokens().validate(token)?;
        set_sentry_user(&identity.user_id, &identity.username);
        tracing::Span::current().record("user_id", identity.user_id.as_i32());

        Ok(Self(identity))
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Require `capability`.
///
/// # Errors
///
/// `Forbidden` if no role of the caller grants it.
pub fn ensure(identity: &Identity, capability: Capability) -> Result<(), AppError> {
    if identity.can(capability) {
        Ok(())
    } else {
        tracing::debug!(user_id = %identity.user_id, ?capability, "capability missing");
        Err(AppError::Forbidden)
    }
}

/// Require that the caller is `owner` or holds `capability`.
///
/// # Errors
///
/// `Forbidden` otherwise.
pub fn ensure_owner_or(
    identity: &Identity,
    owner: UserId,
    capability: Capability,
) -> Result<(), AppError> {
    if identity.is(owner) {
        return Ok(());
    }
    ensure(identity, capability)
}
