//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Service errors convert with
//! `?`; the response carries a JSON body `{"error": "<message>"}` and never
//! exposes storage or hashing details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AuthError, CatalogError, Resource, TokenError};

const INTERNAL: &str = "Internal server error";

/// Application-level error type for the HTTP API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Credential store failure.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Token issuance or validation failure.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// Catalog failure.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The caller is authenticated but lacks a capability.
    #[error("Forbidden")]
    Forbidden,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AuthError::DuplicateUsername | AuthError::ConstraintViolation(_) => {
                    StatusCode::CONFLICT
                }
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::NotFound => StatusCode::NOT_FOUND,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Token(err) => match err {
                TokenError::Invalid => StatusCode::UNAUTHORIZED,
                TokenError::EmptySigningKey | TokenError::Signing => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(_) | CatalogError::ReferenceViolation(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::ConstraintViolation(_) => StatusCode::CONFLICT,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Client-facing message. Server errors never describe themselves.
    fn message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::Validation(inner) => inner.to_string(),
                AuthError::DuplicateUsername => "Username is already taken".to_string(),
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::NotFound => "User not found".to_string(),
                AuthError::ConstraintViolation(name) => format!("Constraint violated: {name}"),
                AuthError::Repository(_) | AuthError::PasswordHash => INTERNAL.to_string(),
            },
            Self::Token(TokenError::Invalid) => "Invalid token".to_string(),
            Self::Catalog(err) => match err {
                CatalogError::Validation(inner) => inner.to_string(),
                CatalogError::NotFound(resource) => match resource {
                    Resource::Game => "Game not found".to_string(),
                    Resource::Review => "Review not found".to_string(),
                },
                CatalogError::ReferenceViolation(target) => {
                    format!("Referenced {target} does not exist")
                }
                CatalogError::ConstraintViolation(name) => format!("Constraint violated: {name}"),
                CatalogError::Repository(_) => INTERNAL.to_string(),
            },
            Self::Forbidden => "Forbidden".to_string(),
            Self::Token(_) => INTERNAL.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("catalog", "Review created", Some(&[("game_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use game_review_core::ValidationError;

    use super::*;
    use crate::db::{ReferenceTarget, RepositoryError};

    async fn render(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json["error"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_auth_errors() {
        assert_eq!(
            render(AuthError::DuplicateUsername.into()).await,
            (StatusCode::CONFLICT, "Username is already taken".to_string())
        );
        assert_eq!(
            render(AuthError::InvalidCredentials.into()).await,
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        );
        let (status, message) = render(
            AuthError::Validation(ValidationError::TooShort {
                field: "password",
                min: 8,
            })
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(message.contains("password"));
    }

    #[tokio::test]
    async fn test_token_errors_are_uniform() {
        assert_eq!(
            render(TokenError::Invalid.into()).await,
            (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
        );
        assert_eq!(
            render(TokenError::Signing.into()).await,
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_catalog_errors() {
        assert_eq!(
            render(CatalogError::NotFound(Resource::Game).into()).await,
            (StatusCode::NOT_FOUND, "Game not found".to_string())
        );
        assert_eq!(
            render(CatalogError::ReferenceViolation(ReferenceTarget::User).into()).await,
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Referenced user does not exist".to_string()
            )
        );
        assert_eq!(
            render(CatalogError::ConstraintViolation("games_title_check".into()).into())
                .await
                .0,
            StatusCode::CONFLICT
        );
        assert_eq!(render(AppError::Forbidden).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = CatalogError::Repository(RepositoryError::DataCorruption(
            "rating 42 in row 7".to_string(),
        ));
        let (status, message) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }
}
