//! Common test utilities for integration tests.
//!
//! The app runs on the in-process store with a fake post service, so these
//! tests need no database. Postgres-backed tests build their own state from
//! `TEST_DATABASE_URL`.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use domain::ports::{PostService, PostServiceError, PostStats};
use fake::{
    faker::name::en::{FirstName, LastName},
    Fake,
};
use persistence::MemoryStore;
use serde_json::{json, Value};
use shared::password::Argon2Hasher;
use squadra_api::{
    app::{create_app, AppState, Stores},
    config::{
        Config, DatabaseConfig, LoggingConfig, NotificationsConfig, PostsConfig, SecurityConfig,
        ServerConfig, SessionConfig,
    },
};
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

static USER_SEQ: AtomicUsize = AtomicUsize::new(1);

/// Records calls and serves canned answers for the remote post service.
#[derive(Default)]
pub struct FakePostService {
    pub fail: AtomicBool,
    pub deleted_posts: Mutex<Vec<i64>>,
    pub deleted_comments: Mutex<Vec<i64>>,
    pub titles: Mutex<HashMap<i64, String>>,
}

impl FakePostService {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_title(&self, post_id: i64, title: &str) {
        self.titles.lock().unwrap().insert(post_id, title.to_string());
    }

    fn check(&self) -> Result<(), PostServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(PostServiceError::Unreachable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PostService for FakePostService {
    async fn delete_post(&self, post_id: i64) -> Result<(), PostServiceError> {
        self.check()?;
        self.deleted_posts.lock().unwrap().push(post_id);
        Ok(())
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<(), PostServiceError> {
        self.check()?;
        self.deleted_comments.lock().unwrap().push(comment_id);
        Ok(())
    }

    async fn stats(&self) -> Result<PostStats, PostServiceError> {
        self.check()?;
        Ok(PostStats {
            total_posts: 42,
            total_comments: 128,
            total_sport_fields: 7,
        })
    }

    async fn post_title(&self, post_id: i64) -> Result<String, PostServiceError> {
        self.check()?;
        self.titles
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .ok_or(PostServiceError::Rejected {
                status: 404,
                message: "not found".to_string(),
            })
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: std::env::var("TEST_DATABASE_URL").unwrap_or_default(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
        session: SessionConfig {
            cookie_secure: false,
            ..SessionConfig::default()
        },
        posts: PostsConfig::default(),
        notifications: NotificationsConfig::default(),
        security: SecurityConfig::default(),
    }
}

/// An app over a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub posts: Arc<FakePostService>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let posts = Arc::new(FakePostService::default());
        let state = AppState::new(
            test_config(),
            Stores::memory(store.clone()),
            posts.clone(),
            Arc::new(Argon2Hasher::with_cost(1024, 1)),
        );
        Self {
            router: create_app(state.clone()),
            state,
            store,
            posts,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send(&self.router, request).await
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.send(request(Method::GET, uri, None, Some(&user.cookie))).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, Some(body), Some(&user.cookie)))
            .await
    }

    pub async fn post_empty(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.send(request(Method::POST, uri, None, Some(&user.cookie))).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> TestResponse {
        self.send(request(Method::DELETE, uri, None, Some(&user.cookie)))
            .await
    }

    pub async fn register(&self) -> TestUser {
        register(&self.router).await
    }

    pub async fn register_admin(&self) -> TestUser {
        let user = self.register().await;
        self.store.set_admin(user.id, true).unwrap();
        user
    }

    /// Registers two users and makes them friends.
    pub async fn friends_pair(&self) -> (TestUser, TestUser) {
        let a = self.register().await;
        let b = self.register().await;
        let sent = self
            .post("/api/v1/friends/requests", &a, json!({ "email": b.email }))
            .await;
        assert_eq!(sent.status, StatusCode::CREATED);
        let accepted = self
            .post_empty(&format!("/api/v1/friends/requests/{}/accept", sent.id()), &b)
            .await;
        assert_eq!(accepted.status, StatusCode::OK);
        (a, b)
    }
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// `name=value` pair ready for a `Cookie` header.
    pub cookie: String,
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub set_cookie: Option<String>,
}

impl TestResponse {
    pub fn id(&self) -> i64 {
        self.body["id"].as_i64().unwrap()
    }

    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

pub fn request(method: Method, uri: &str, body: Option<Value>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        body,
        set_cookie,
    }
}

/// The `name=value` part of a `Set-Cookie` header.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().trim().to_string()
}

pub fn registration_body(username: &str, email: &str) -> Value {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    json!({
        "username": username,
        "email": email,
        "password": PASSWORD,
        "first_name": first_name,
        "last_name": last_name,
    })
}

pub async fn register(router: &Router) -> TestUser {
    let n = USER_SEQ.fetch_add(1, Ordering::SeqCst);
    let username = format!("player_{n}");
    let email = format!("player{n}@example.com");

    let response = send(
        router,
        request(
            Method::POST,
            "/api/v1/auth/register",
            Some(registration_body(&username, &email)),
            None,
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

    TestUser {
        id: response.body["user"]["id"].as_i64().unwrap(),
        username,
        email,
        cookie: cookie_pair(response.set_cookie.as_deref().unwrap()),
    }
}

pub async fn login(router: &Router, identifier: &str) -> TestResponse {
    send(
        router,
        request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "identifier": identifier, "password": PASSWORD })),
            None,
        ),
    )
    .await
}
