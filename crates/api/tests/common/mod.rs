//! Shared harness for API integration tests.
//!
//! Builds the production router over a seeded in-memory store:
//!
//! | Company | Rooms                     | Students                               |
//! |---------|---------------------------|----------------------------------------|
//! | 1       | 10 "Room A", 11 "Room B"  | 1000 Ana (A), 1001 Bruno (A), 1002 Carla (B) |
//! | 2       | 20 "Other"                | 2000 Dora (20)                         |
//!
//! User 100 of company 1 is granted room 10 only; user 101 has no grants.
//! User 200 of company 2 is granted room 20.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use rollbook_core::memory::MemoryStore;
use rollbook_core::period::WeekStart;
use rollbook_core::types::DbId;
use serde_json::Value;
use tower::ServiceExt;

use rollbook_api::auth::jwt::{generate_access_token, JwtConfig};
use rollbook_api::config::{ServerConfig, StorageBackend};
use rollbook_api::engine::Stores;
use rollbook_api::router::build_app_router;
use rollbook_api::state::AppState;

pub const COMPANY: DbId = 1;
pub const OTHER_COMPANY: DbId = 2;
pub const USER: DbId = 100;
pub const OUTSIDER: DbId = 101;
pub const OTHER_USER: DbId = 200;
pub const ROOM_A: DbId = 10;
pub const ROOM_B: DbId = 11;
pub const OTHER_ROOM: DbId = 20;
pub const S1: DbId = 1000;
pub const S2: DbId = 1001;
pub const S3: DbId = 1002;
pub const OTHER_STUDENT: DbId = 2000;

/// Build a test `ServerConfig` with safe defaults and in-memory storage.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        storage: StorageBackend::Memory,
        database_url: None,
        db_max_connections: 1,
        week_start: WeekStart::Monday,
        report_max_range_days: 1830,
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl TestApp {
    pub fn token(&self, user_id: DbId, company_id: DbId) -> String {
        generate_access_token(user_id, company_id, "operator", &self.state.config.jwt)
            .expect("token generation should succeed")
    }

    /// Token for user 100 of company 1.
    pub fn user_token(&self) -> String {
        self.token(USER, COMPANY)
    }
}

pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_room(COMPANY, ROOM_A, "Room A").await;
    store.add_room(COMPANY, ROOM_B, "Room B").await;
    store.add_room(OTHER_COMPANY, OTHER_ROOM, "Other").await;
    store.add_student(COMPANY, S1, "Ana").await;
    store.add_student(COMPANY, S2, "Bruno").await;
    store.add_student(COMPANY, S3, "Carla").await;
    store.add_student(OTHER_COMPANY, OTHER_STUDENT, "Dora").await;
    store.enroll(ROOM_A, S1).await;
    store.enroll(ROOM_A, S2).await;
    store.enroll(ROOM_B, S3).await;
    store.enroll(OTHER_ROOM, OTHER_STUDENT).await;
    store.grant(COMPANY, USER, ROOM_A).await;
    store.grant(OTHER_COMPANY, OTHER_USER, OTHER_ROOM).await;
    store
}

/// Build the full application router with all middleware layers.
///
/// Uses the same [`build_app_router`] as `main.rs`, so tests exercise the
/// production middleware stack.
pub async fn build_test_app() -> TestApp {
    build_test_app_with(|stores| stores).await
}

/// Like [`build_test_app`], but lets the caller swap individual stores,
/// e.g. to wrap the attendance store with injected failures.
pub async fn build_test_app_with(customize: impl FnOnce(Stores) -> Stores) -> TestApp {
    let config = test_config();
    let store = seeded_store().await;
    let stores = customize(Stores::memory(Arc::clone(&store)));
    let state = AppState::new(config.clone(), stores, None);
    let router = build_app_router(state.clone(), &config);
    TestApp {
        router,
        store,
        state,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn put_json(app: &Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn post_json(app: &Router, uri: &str, token: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
