//! Account endpoint tests: password change, user lookup and favorites.

mod common;

use axum::http::{Method, StatusCode};
use common::{cookie_pair, login, request, TestApp, TestUser, PASSWORD};
use serde_json::json;

const NEW_PASSWORD: &str = "a-much-better-secret";

async fn login_with(app: &TestApp, identifier: &str, password: &str) -> common::TestResponse {
    app.send(request(
        Method::POST,
        "/api/v1/auth/login",
        Some(json!({ "identifier": identifier, "password": password })),
        None,
    ))
    .await
}

/// A second signed-in session of the same account.
async fn second_session(app: &TestApp, user: &TestUser) -> TestUser {
    let response = login(&app.router, &user.username).await;
    assert_eq!(response.status, StatusCode::OK);
    TestUser {
        cookie: cookie_pair(response.set_cookie.as_deref().unwrap()),
        ..user.clone()
    }
}

#[tokio::test]
async fn test_change_password_flow() {
    let app = TestApp::new();
    let user = app.register().await;
    let other_device = second_session(&app, &user).await;

    let changed = app
        .post(
            "/api/v1/users/me/password",
            &user,
            json!({ "current_password": PASSWORD, "new_password": NEW_PASSWORD }),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK, "{:?}", changed.body);
    assert_eq!(changed.body["revoked_sessions"], 1);

    // The caller stays signed in; the other device does not.
    assert_eq!(app.get("/api/v1/users/me", &user).await.status, StatusCode::OK);
    assert_eq!(
        app.get("/api/v1/users/me", &other_device).await.status,
        StatusCode::UNAUTHORIZED
    );

    let old = login_with(&app, &user.username, PASSWORD).await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let new = login_with(&app, &user.username, NEW_PASSWORD).await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_rejects_wrong_current_password() {
    let app = TestApp::new();
    let user = app.register().await;
    let other_device = second_session(&app, &user).await;

    let refused = app
        .post(
            "/api/v1/users/me/password",
            &user,
            json!({ "current_password": "not-my-password", "new_password": NEW_PASSWORD }),
        )
        .await;
    assert_eq!(refused.status, StatusCode::UNAUTHORIZED);
    assert_eq!(refused.error_code(), "unauthorized");

    assert_eq!(
        app.get("/api/v1/users/me", &other_device).await.status,
        StatusCode::OK
    );
    assert_eq!(login(&app.router, &user.username).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_change_password_validates_new_password() {
    let app = TestApp::new();
    let user = app.register().await;

    let short = app
        .post(
            "/api/v1/users/me/password",
            &user,
            json!({ "current_password": PASSWORD, "new_password": "short" }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.error_code(), "validation_error");

    let anonymous = app
        .send(request(
            Method::POST,
            "/api/v1/users/me/password",
            Some(json!({ "current_password": PASSWORD, "new_password": NEW_PASSWORD })),
            None,
        ))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_lookup_by_id_and_email() {
    let app = TestApp::new();
    let caller = app.register().await;
    let target = app.register().await;

    let by_id = app
        .get(&format!("/api/v1/users/{}", target.id), &caller)
        .await;
    assert_eq!(by_id.status, StatusCode::OK);
    assert_eq!(by_id.body["username"], target.username);
    assert!(by_id.body.get("password_hash").is_none());
    assert!(by_id.body.get("is_admin").is_none());

    let by_email = app
        .get(
            &format!("/api/v1/users/by-email?email={}", target.email.to_uppercase()),
            &caller,
        )
        .await;
    assert_eq!(by_email.status, StatusCode::OK);
    assert_eq!(by_email.body["id"], target.id);

    let unknown = app.get("/api/v1/users/999999", &caller).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let unknown_email = app
        .get("/api/v1/users/by-email?email=nobody@example.com", &caller)
        .await;
    assert_eq!(unknown_email.status, StatusCode::NOT_FOUND);

    let missing = app.get("/api/v1/users/by-email", &caller).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    // "me" still resolves to the caller rather than an id lookup.
    let me = app.get("/api/v1/users/me", &caller).await;
    assert_eq!(me.body["id"], caller.id);
}

#[tokio::test]
async fn test_favorites_lifecycle() {
    let app = TestApp::new();
    let user = app.register().await;
    let other = app.register().await;

    for post_id in [10, 20, 10] {
        let added = app
            .post("/api/v1/favorites", &user, json!({ "post_id": post_id }))
            .await;
        assert_eq!(added.status, StatusCode::OK);
        assert_eq!(added.body["post_id"], post_id);
        assert_eq!(added.body["is_favorite"], true);
    }

    let list = app.get("/api/v1/favorites", &user).await;
    assert_eq!(list.body["count"], 2);
    assert_eq!(list.body["favorites"][0]["post_id"], 20);
    assert_eq!(list.body["favorites"][1]["post_id"], 10);

    let status = app.get("/api/v1/favorites/10", &user).await;
    assert_eq!(status.body["is_favorite"], true);
    let theirs = app.get("/api/v1/favorites/10", &other).await;
    assert_eq!(theirs.body["is_favorite"], false);

    for _ in 0..2 {
        let removed = app.delete("/api/v1/favorites/10", &user).await;
        assert_eq!(removed.status, StatusCode::OK);
        assert_eq!(removed.body["is_favorite"], false);
    }

    let list = app.get("/api/v1/favorites", &user).await;
    assert_eq!(list.body["count"], 1);
    assert_eq!(list.body["favorites"][0]["post_id"], 20);
}

#[tokio::test]
async fn test_favorite_requires_positive_post_id() {
    let app = TestApp::new();
    let user = app.register().await;

    let bad = app
        .post("/api/v1/favorites", &user, json!({ "post_id": 0 }))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.error_code(), "validation_error");

    let anonymous = app
        .send(request(Method::GET, "/api/v1/favorites", None, None))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}
