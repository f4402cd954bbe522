//! Registration, login, bearer tokens and account management over HTTP.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Duration;
use secrecy::SecretString;
use serde_json::json;

use game_review_integration_tests::{TEST_JWT_KEY, TEST_PASSWORD, TestApp};
use game_review_server::services::{TokenService, TokenSettings};

#[tokio::test]
async fn test_health_and_request_id() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
    assert!(response.request_id.is_some());
}

#[tokio::test]
async fn test_register() {
    let app = TestApp::new();

    let created = app.register("alice").await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["username"], "alice");
    assert_eq!(created.body["email"], "alice@example.com");
    assert_eq!(created.body["roles"], json!(["member"]));
    assert!(created.body.get("password_hash").is_none());

    let duplicate = app.register("alice").await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.error(), "Username is already taken");

    // Usernames are case-sensitive.
    assert_eq!(app.register("Alice").await.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();

    let cases = [
        json!({ "username": "al", "email": "al@example.com", "password": TEST_PASSWORD }),
        json!({ "username": "has space", "email": "a@example.com", "password": TEST_PASSWORD }),
        json!({ "username": "bob", "email": "not-an-email", "password": TEST_PASSWORD }),
        json!({ "username": "bob", "email": "bob@example.com", "password": "short" }),
    ];
    for body in cases {
        let response = app.post("/api/auth/register", None, body.clone()).await;
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    }
    assert!(app.state.credentials().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_registration_creates_one_account() {
    let app = std::sync::Arc::new(TestApp::new());

    let attempts = (0..8).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { app.register("racer").await.status })
    });
    let mut statuses = Vec::new();
    for attempt in attempts {
        statuses.push(attempt.await.unwrap());
    }

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        1
    );
    assert!(
        statuses
            .iter()
            .all(|s| *s == StatusCode::CREATED || *s == StatusCode::CONFLICT)
    );
}

#[tokio::test]
async fn test_login_failures_are_identical() {
    let app = TestApp::new();
    app.member("carol").await;

    let wrong_password = app.login("carol", "not-the-password").await;
    let unknown_user = app.login("nobody", TEST_PASSWORD).await;
    let malformed_user = app.login("x", TEST_PASSWORD).await;

    for response in [&wrong_password, &unknown_user, &malformed_user] {
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error(), "Invalid credentials");
    }
    assert_eq!(wrong_password.body, unknown_user.body);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new();
    let (id, _) = app.member("dave").await;

    let login = app.login("dave", TEST_PASSWORD).await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["token"].as_str().unwrap();
    assert_eq!(token.split('.').count(), 3);
    assert!(login.body["expires_at"].is_string());

    let me = app.get("/api/auth/me", Some(token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user_id"], id.as_i32());
    assert_eq!(me.body["username"], "dave");
    assert_eq!(me.body["roles"], json!(["member"]));
}

#[tokio::test]
async fn test_rejected_tokens() {
    let app = TestApp::new();
    let (_, token) = app.member("erin").await;

    let missing = app.get("/api/auth/me", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.error(), "Invalid token");

    let basic = app
        .send(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Basic ZXJpbjpwdw==")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(basic.status, StatusCode::UNAUTHORIZED);

    // Flip the last signature character.
    let mut tampered = token.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });
    let response = app.get("/api/auth/me", Some(&tampered)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "Invalid token");

    assert_eq!(
        app.get("/api/auth/me", Some("not.a.jwt")).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_tokens_from_other_issuers_are_rejected() {
    let app = TestApp::new();
    app.member("frank").await;
    let user = app
        .state
        .credentials()
        .find_by_username("frank")
        .await
        .unwrap()
        .unwrap();

    let foreign = [
        TokenSettings::new(
            SecretString::from("Zy8&Wx7^Vu6%Ts5$Rq4#Po3@Nm2!Lk1*"),
            "game-review-system",
            "game-review-clients",
            Duration::hours(1),
        ),
        TokenSettings::new(
            SecretString::from(TEST_JWT_KEY),
            "someone-else",
            "game-review-clients",
            Duration::hours(1),
        ),
        TokenSettings::new(
            SecretString::from(TEST_JWT_KEY),
            "game-review-system",
            "other-clients",
            Duration::hours(1),
        ),
    ];

    for settings in foreign {
        let token = TokenService::new(settings.unwrap()).issue(&user).unwrap();
        let response = app.get("/api/auth/me", Some(&token.token)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.error(), "Invalid token");
    }

    // Same settings as the server: accepted.
    let own = app.state.tokens().issue(&user).unwrap();
    assert_eq!(
        app.get("/api/auth/me", Some(&own.token)).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app = TestApp::new();
    app.member("gina").await;
    let user = app
        .state
        .credentials()
        .find_by_username("gina")
        .await
        .unwrap()
        .unwrap();

    let issued_at = chrono::Utc::now() - Duration::hours(25);
    let stale = app.state.tokens().issue_at(&user, issued_at).unwrap();
    let response = app.get("/api/auth/me", Some(&stale.token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_listing_needs_manage_users() {
    let app = TestApp::new();
    let (_, member) = app.member("henry").await;
    let (_, admin) = app.admin("root").await;

    assert_eq!(
        app.get("/api/users", Some(&member)).await.status,
        StatusCode::FORBIDDEN
    );

    let listed = app.get("/api/users", Some(&admin)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_profile_update_rules() {
    let app = TestApp::new();
    let (ivy, ivy_token) = app.member("ivy").await;
    let (jack, jack_token) = app.member("jack").await;

    let renamed = app
        .put(
            &format!("/api/users/{ivy}"),
            Some(&ivy_token),
            json!({ "email": "ivy@games.example.org" }),
        )
        .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["email"], "ivy@games.example.org");

    let other = app
        .put(
            &format!("/api/users/{ivy}"),
            Some(&jack_token),
            json!({ "email": "stolen@example.com" }),
        )
        .await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let taken = app
        .put(
            &format!("/api/users/{jack}"),
            Some(&jack_token),
            json!({ "username": "ivy" }),
        )
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let new_password = app
        .put(
            &format!("/api/users/{jack}"),
            Some(&jack_token),
            json!({ "password": "a-brand-new-passphrase" }),
        )
        .await;
    assert_eq!(new_password.status, StatusCode::OK);
    assert_eq!(
        app.login("jack", TEST_PASSWORD).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.login("jack", "a-brand-new-passphrase").await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_role_management() {
    let app = TestApp::new();
    let (kim, kim_token) = app.member("kim").await;
    let (_, admin) = app.admin("boss").await;

    let denied = app
        .put(
            &format!("/api/users/{kim}/roles"),
            Some(&kim_token),
            json!({ "roles": ["admin"] }),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let empty = app
        .put(
            &format!("/api/users/{kim}/roles"),
            Some(&admin),
            json!({ "roles": [] }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::UNPROCESSABLE_ENTITY);

    let promoted = app
        .put(
            &format!("/api/users/{kim}/roles"),
            Some(&admin),
            json!({ "roles": ["member", "admin"] }),
        )
        .await;
    assert_eq!(promoted.status, StatusCode::OK);
    assert_eq!(promoted.body["roles"], json!(["member", "admin"]));

    // The old token keeps its old claims; a fresh one carries the new role.
    assert_eq!(
        app.get("/api/users", Some(&kim_token)).await.status,
        StatusCode::FORBIDDEN
    );
    let fresh = app.token("kim").await;
    assert_eq!(
        app.get("/api/users", Some(&fresh)).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_missing_user() {
    let app = TestApp::new();
    let (_, admin) = app.admin("ops").await;

    let response = app.get("/api/users/9999", Some(&admin)).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error(), "User not found");

    assert_eq!(
        app.delete("/api/users/9999", Some(&admin)).await.status,
        StatusCode::NOT_FOUND
    );
}
