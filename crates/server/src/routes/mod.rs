//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness check
//!
//! # Auth
//! POST   /api/auth/register          - Create account
//! POST   /api/auth/login             - Exchange credentials for a token
//! GET    /api/auth/me                - Identity of the presented token
//!
//! # Games
//! GET    /api/games                  - All games with derived scores
//! POST   /api/games                  - Add a game (CurateCatalog)
//! GET    /api/games/search           - Title search (?filter=&sort=asc|desc)
//! GET    /api/games/random           - Random pick (?status=backlog,done)
//! GET    /api/games/genre/{genre}    - Exact genre match
//! GET    /api/games/status/{status}  - Games with one status
//! GET    /api/games/{id}             - One game
//! PUT    /api/games/{id}             - Replace a game (CurateCatalog)
//! DELETE /api/games/{id}             - Remove a game and its reviews (ModerateContent)
//! GET    /api/games/{id}/reviews     - Reviews of a game
//! GET    /api/games/{id}/rating      - Average rating and review count
//!
//! # Reviews
//! GET    /api/reviews                - All reviews
//! POST   /api/reviews                - Review a game (ReviewGames)
//! GET    /api/reviews/{id}           - One review
//! PUT    /api/reviews/{id}           - Edit (author or ModerateContent)
//! DELETE /api/reviews/{id}           - Remove (author or ModerateContent)
//!
//! # Users
//! GET    /api/users                  - All accounts (ManageUsers)
//! GET    /api/users/{id}             - Profile (any bearer)
//! PUT    /api/users/{id}             - Edit (self or ManageUsers)
//! PUT    /api/users/{id}/roles       - Replace roles (ManageUsers)
//! DELETE /api/users/{id}             - Remove with reviews (self or ManageUsers)
//! GET    /api/users/{id}/reviews     - Reviews written by the user
//! ```

pub mod auth;
pub mod games;
pub mod reviews;
pub mod users;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the game routes router.
pub fn game_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(games::index).post(games::create))
        .route("/search", get(games::search))
        .route("/random", get(games::random))
        .route("/genre/{genre}", get(games::by_genre))
        .route("/status/{status}", get(games::by_status))
        .route(
            "/{id}",
            get(games::show).put(games::update).delete(games::destroy),
        )
        .route("/{id}/reviews", get(games::reviews))
        .route("/{id}/rating", get(games::rating))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::index).post(reviews::create))
        .route(
            "/{id}",
            get(reviews::show)
                .put(reviews::update)
                .delete(reviews::destroy),
        )
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
        .route("/{id}/roles", put(users::set_roles))
        .route("/{id}/reviews", get(users::reviews))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .nest("/api/games", game_routes())
        .nest("/api/reviews", review_routes())
        .nest("/api/users", user_routes())
}

/// The complete application: routes, tracing, request ids and Sentry.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes())
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
