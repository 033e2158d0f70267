#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use stepiva_api::auth::jwt::{generate_access_token, JwtConfig};
use stepiva_api::config::ServerConfig;
use stepiva_api::router::build_app_router;
use stepiva_api::state::AppState;
use stepiva_assistant::{AssistantClient, AssistantConfig};
use stepiva_core::roles::{ROLE_ADMIN, ROLE_USER};
use stepiva_events::{NotificationDispatcher, UsageBus};

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default),
/// a 30-second request timeout and an open reminder trigger.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 60,
        },
        cron_secret: None,
        reminder_scan_interval_secs: 0,
        reminder_test_user_id: None,
        app_url: "http://localhost:5173".to_string(),
    }
}

/// Application state with no assistant and no delivery channels, so every
/// AI feature takes its fallback path and dispatch only records `skipped`.
pub fn build_test_state(pool: PgPool, config: ServerConfig) -> AppState {
    let usage_bus = Arc::new(UsageBus::default());
    let dispatcher = NotificationDispatcher::new(
        pool.clone(),
        Arc::clone(&usage_bus),
        None,
        None,
        config.app_url.clone(),
    );
    AppState {
        pool,
        config: Arc::new(config),
        assistant: None,
        usage_bus,
        dispatcher: Arc::new(dispatcher),
    }
}

/// Full application router (same middleware stack as production).
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let state = build_test_state(pool, config.clone());
    build_app_router(state, &config)
}

/// Assistant client pointed at a mock server, polling fast.
pub fn mock_assistant(base_url: &str) -> Arc<AssistantClient> {
    let mut config = AssistantConfig::new("sk-test", "asst_test", base_url);
    config.poll_interval = Duration::from_millis(5);
    config.max_poll_attempts = 3;
    Arc::new(AssistantClient::new(config))
}

/// Like [`build_test_app`] but with an assistant talking to `base_url`.
pub fn build_test_app_with_assistant(pool: PgPool, base_url: &str) -> Router {
    let config = test_config();
    let mut state = build_test_state(pool, config.clone());
    state.assistant = Some(mock_assistant(base_url));
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn token_for(user_id: &str) -> String {
    generate_access_token(user_id, ROLE_USER, &test_config().jwt).unwrap()
}

pub fn admin_token(user_id: &str) -> String {
    generate_access_token(user_id, ROLE_ADMIN, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn patch_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response {
    send(app, Method::PATCH, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
