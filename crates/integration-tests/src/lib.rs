//! Integration tests for the Game Review System.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p game-review-integration-tests
//! ```
//!
//! Every test drives the full router in-process with
//! `tower::ServiceExt::oneshot` over a fresh [`MemoryStore`], so no database
//! or network is needed.
//!
//! # Test Categories
//!
//! - `auth_flow` - registration, login, tokens, account management
//! - `catalog_flow` - games, reviews, ratings, search

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use game_review_core::{Role, UserId};
use game_review_server::db::MemoryStore;
use game_review_server::services::PasswordPolicy;
use game_review_server::{AppState, ServerConfig, build_router};

/// Signing key used by every test app.
pub const TEST_JWT_KEY: &str = "q7R!vX2#mB9$kL4@nP8%tY3^wZ6&cF1*";

/// Password used by the helper accounts.
pub const TEST_PASSWORD: &str = "hunter2-but-longer";

/// A response with its body decoded.
///
/// JSON bodies become the parsed value, other non-empty bodies a JSON string,
/// empty bodies `Null`.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: Value,
}

impl TestResponse {
    /// The `error` message of a failed request.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// An application over an in-memory store.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    router: Router,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// # Panics
    ///
    /// If the fixed test configuration is rejected.
    #[must_use]
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(&config, store.clone(), PasswordPolicy::for_tests())
            .expect("Failed to build test state");
        let router = build_router(state.clone());
        Self {
            state,
            store,
            router,
        }
    }

    /// Send one request through the router.
    ///
    /// # Panics
    ///
    /// If the request cannot be built or the body cannot be read.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Send a prepared request.
    ///
    /// # Panics
    ///
    /// If the router fails or the body cannot be read.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            request_id,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register `username` with [`TEST_PASSWORD`].
    pub async fn register(&self, username: &str) -> TestResponse {
        self.post(
            "/api/auth/register",
            None,
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": TEST_PASSWORD,
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.post(
            "/api/auth/login",
            None,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Register a member and return their id and a token.
    ///
    /// # Panics
    ///
    /// If registration or login fails.
    pub async fn member(&self, username: &str) -> (UserId, String) {
        let registered = self.register(username).await;
        assert_eq!(registered.status, StatusCode::CREATED, "{registered:?}");
        let id = registered.body["id"]
            .as_i64()
            .and_then(|id| i32::try_from(id).ok())
            .map(UserId::new)
            .expect("Profile has an id");
        (id, self.token(username).await)
    }

    /// Register an admin and return their id and a token.
    ///
    /// # Panics
    ///
    /// If any step fails.
    pub async fn admin(&self, username: &str) -> (UserId, String) {
        let (id, _) = self.member(username).await;
        self.state
            .credentials()
            .grant_role(id, Role::Admin)
            .await
            .expect("Failed to grant admin");
        (id, self.token(username).await)
    }

    /// Log in with [`TEST_PASSWORD`] and return the token.
    ///
    /// # Panics
    ///
    /// If login fails.
    pub async fn token(&self, username: &str) -> String {
        let login = self.login(username, TEST_PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK, "{login:?}");
        login.body["token"]
            .as_str()
            .expect("Login returns a token")
            .to_string()
    }

    /// Create a game and return its id.
    ///
    /// # Panics
    ///
    /// If creation fails.
    pub async fn game(&self, token: &str, title: &str, status: &str) -> i64 {
        let created = self
            .post(
                "/api/games",
                Some(token),
                json!({
                    "title": title,
                    "platform": "PC",
                    "genre": "Strategy",
                    "status": status,
                }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{created:?}");
        created.body["id"].as_i64().expect("Game has an id")
    }

    /// Review a game and return the review id.
    ///
    /// # Panics
    ///
    /// If creation fails.
    pub async fn review(&self, token: &str, game_id: i64, rating: i64) -> i64 {
        let created = self
            .post(
                "/api/reviews",
                Some(token),
                json!({ "game_id": game_id, "rating": rating }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED, "{created:?}");
        created.body["id"].as_i64().expect("Review has an id")
    }
}

/// Configuration for tests: fixed key, in-memory store.
///
/// # Panics
///
/// If the fixed values are rejected.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig::from_lookup(|key| match key {
        "GRS_JWT_KEY" => Some(TEST_JWT_KEY.to_string()),
        _ => None,
    })
    .expect("Test configuration is valid")
}
