//! Friend request and friendship endpoint tests.

mod common;

use axum::http::{Method, StatusCode};
use common::{request, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_friend_request_lifecycle() {
    let app = TestApp::new();
    let alice = app.register().await;
    let bob = app.register().await;

    let sent = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": bob.email }))
        .await;
    assert_eq!(sent.status, StatusCode::CREATED);
    assert_eq!(sent.body["status"], "pending");
    assert_eq!(sent.body["sender_id"], alice.id);
    assert_eq!(sent.body["receiver_id"], bob.id);

    let incoming = app.get("/api/v1/friends/requests", &bob).await;
    assert_eq!(incoming.status, StatusCode::OK);
    assert_eq!(incoming.body["count"], 1);
    assert_eq!(incoming.body["requests"][0]["user"]["id"], alice.id);

    let outgoing = app.get("/api/v1/friends/requests/sent", &alice).await;
    assert_eq!(outgoing.body["count"], 1);
    assert_eq!(outgoing.body["requests"][0]["user"]["id"], bob.id);

    let summary = app.get("/api/v1/notifications/summary", &bob).await;
    assert_eq!(summary.body["friend_requests"], 1);

    let accepted = app
        .post_empty(&format!("/api/v1/friends/requests/{}/accept", sent.id()), &bob)
        .await;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(accepted.body["status"], "accepted");

    for (user, other) in [(&alice, &bob), (&bob, &alice)] {
        let friends = app.get("/api/v1/friends", user).await;
        assert_eq!(friends.body["count"], 1);
        assert_eq!(friends.body["friends"][0]["user"]["id"], other.id);

        let status = app
            .get(&format!("/api/v1/friends/{}/status", other.id), user)
            .await;
        assert_eq!(status.body["are_friends"], true);
    }

    let count = app.get("/api/v1/friends/count", &alice).await;
    assert_eq!(count.body["count"], 1);

    // The request notification is withdrawn once answered.
    let summary = app.get("/api/v1/notifications/summary", &bob).await;
    assert_eq!(summary.body["friend_requests"], 0);

    // The sender hears back.
    let list = app.get("/api/v1/notifications", &alice).await;
    let types: Vec<_> = list.body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["general"]);

    let incoming = app.get("/api/v1/friends/requests", &bob).await;
    assert_eq!(incoming.body["count"], 0);
}

#[tokio::test]
async fn test_duplicate_request_conflicts() {
    let app = TestApp::new();
    let alice = app.register().await;
    let bob = app.register().await;

    let first = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": bob.email }))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);

    let again = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": bob.email }))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    // A pending request blocks the reverse direction too.
    let reverse = app
        .post("/api/v1/friends/requests", &bob, json!({ "email": alice.email }))
        .await;
    assert_eq!(reverse.status, StatusCode::CONFLICT);
    assert_eq!(reverse.error_code(), "conflict");
}

#[tokio::test]
async fn test_request_to_existing_friend_conflicts() {
    let app = TestApp::new();
    let (alice, bob) = app.friends_pair().await;

    let response = app
        .post("/api/v1/friends/requests", &bob, json!({ "email": alice.email }))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_request_to_self_rejected() {
    let app = TestApp::new();
    let alice = app.register().await;

    let response = app
        .post(
            "/api/v1/friends/requests",
            &alice,
            json!({ "email": alice.email.to_uppercase() }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "self_reference");
}

#[tokio::test]
async fn test_request_to_unknown_email() {
    let app = TestApp::new();
    let alice = app.register().await;

    let response = app
        .post(
            "/api/v1/friends/requests",
            &alice,
            json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_request_with_invalid_email() {
    let app = TestApp::new();
    let alice = app.register().await;

    let response = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": "not-an-email" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "validation_error");
}

#[tokio::test]
async fn test_reject_request() {
    let app = TestApp::new();
    let alice = app.register().await;
    let bob = app.register().await;

    let sent = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": bob.email }))
        .await;
    let rejected = app
        .post_empty(&format!("/api/v1/friends/requests/{}/reject", sent.id()), &bob)
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["status"], "rejected");

    let status = app
        .get(&format!("/api/v1/friends/{}/status", bob.id), &alice)
        .await;
    assert_eq!(status.body["are_friends"], false);

    // A resolved request can no longer be accepted.
    let late = app
        .post_empty(&format!("/api/v1/friends/requests/{}/accept", sent.id()), &bob)
        .await;
    assert_eq!(late.status, StatusCode::CONFLICT);
    assert_eq!(late.error_code(), "invalid_state");

    // A fresh request is allowed after rejection.
    let again = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": bob.email }))
        .await;
    assert_eq!(again.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_cancel_request() {
    let app = TestApp::new();
    let alice = app.register().await;
    let bob = app.register().await;

    let sent = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": bob.email }))
        .await;

    // Only the sender may cancel.
    let by_receiver = app
        .post_empty(&format!("/api/v1/friends/requests/{}/cancel", sent.id()), &bob)
        .await;
    assert_eq!(by_receiver.status, StatusCode::FORBIDDEN);

    let cancelled = app
        .post_empty(&format!("/api/v1/friends/requests/{}/cancel", sent.id()), &alice)
        .await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["status"], "cancelled");

    let summary = app.get("/api/v1/notifications/summary", &bob).await;
    assert_eq!(summary.body["friend_requests"], 0);
}

#[tokio::test]
async fn test_only_receiver_can_accept() {
    let app = TestApp::new();
    let alice = app.register().await;
    let bob = app.register().await;
    let mallory = app.register().await;

    let sent = app
        .post("/api/v1/friends/requests", &alice, json!({ "email": bob.email }))
        .await;

    for user in [&alice, &mallory] {
        let response = app
            .post_empty(&format!("/api/v1/friends/requests/{}/accept", sent.id()), user)
            .await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
    }

    let missing = app
        .post_empty("/api/v1/friends/requests/999999/accept", &bob)
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_friend() {
    let app = TestApp::new();
    let (alice, bob) = app.friends_pair().await;

    let removed = app
        .delete(&format!("/api/v1/friends/{}", bob.id), &alice)
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let friends = app.get("/api/v1/friends", &bob).await;
    assert_eq!(friends.body["count"], 0);

    let again = app
        .delete(&format!("/api/v1/friends/{}", bob.id), &alice)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let self_removal = app
        .delete(&format!("/api/v1/friends/{}", alice.id), &alice)
        .await;
    assert_eq!(self_removal.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mutual_friends() {
    let app = TestApp::new();
    let (alice, carol) = app.friends_pair().await;
    let bob = app.register().await;

    let sent = app
        .post("/api/v1/friends/requests", &bob, json!({ "email": carol.email }))
        .await;
    app.post_empty(&format!("/api/v1/friends/requests/{}/accept", sent.id()), &carol)
        .await;

    let mutual = app
        .get(&format!("/api/v1/friends/{}/mutual", bob.id), &alice)
        .await;
    assert_eq!(mutual.status, StatusCode::OK);
    assert_eq!(mutual.body["count"], 1);
    assert_eq!(mutual.body["mutual_friends"][0]["id"], carol.id);
}

#[tokio::test]
async fn test_search_excludes_self_and_friends() {
    let app = TestApp::new();
    let (alice, bob) = app.friends_pair().await;
    let carol = app.register().await;

    let response = app.get("/api/v1/users/search?q=player", &alice).await;
    assert_eq!(response.status, StatusCode::OK);

    let ids: Vec<i64> = response.body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_i64().unwrap())
        .collect();
    assert!(ids.contains(&carol.id));
    assert!(!ids.contains(&alice.id));
    assert!(!ids.contains(&bob.id));

    let exact = app
        .get(&format!("/api/v1/users/search?q={}", carol.username), &alice)
        .await;
    assert_eq!(exact.body["users"][0]["id"], carol.id);

    let blank = app.get("/api/v1/users/search?q=", &alice).await;
    assert_eq!(blank.body["users"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_friend_routes_require_session() {
    let app = TestApp::new();

    let response = app
        .send(request(Method::GET, "/api/v1/friends", None, None))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app
        .send(request(
            Method::GET,
            "/api/v1/friends",
            None,
            Some("session_id=forged-token"),
        ))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
