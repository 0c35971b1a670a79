//! Shared harness for the HTTP integration tests.
//!
//! The app runs over an in-process [`MemoryStore`], so these tests need no
//! database. Each test file uses a different subset of the helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use relflow_api::auth::jwt::{generate_access_token, JwtConfig};
use relflow_api::config::{ServerConfig, WorkflowConfig};
use relflow_api::router::build_app_router;
use relflow_api::state::AppState;
use relflow_core::enums::{
    TestGatingStatus, UpdateRequest, UpdateSeverity, UpdateStatus, UpdateSuggestion, UpdateType,
};
use relflow_core::memory::MemoryStore;
use relflow_core::model::{title_for, Build, Release, Update};
use relflow_core::service::UpdateService;
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        workflow: WorkflowConfig::default(),
    }
}

pub fn release(name: &str, version: i32) -> Release {
    Release {
        id: i64::from(version),
        name: name.to_string(),
        long_name: format!("Fedora {version}"),
        version,
        id_prefix: "FEDORA".to_string(),
    }
}

/// The app plus a handle on its store for seeding and inspection.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
}

/// Build the full application router, with every middleware layer, over a
/// memory store that knows releases F39, F40 and EL9.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryStore::with_releases(vec![
        release("F39", 39),
        release("F40", 40),
        release("EL9", 9),
    ]));
    let service = UpdateService::new(
        store.clone(),
        config.workflow.requirements.clone(),
        config.workflow.obsoletion.clone(),
    );
    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
        pool: None,
    };
    let app = build_app_router(state, &config).unwrap();
    TestApp { app, store }
}

pub fn token_for(username: &str, role: &str) -> String {
    generate_access_token(username, role, &test_config().jwt).unwrap()
}

/// A pending update owned by `user`, submitted `days_ago` days ago.
pub fn stored_update(alias: &str, nvr: &str, release: &str, user: &str, days_ago: i64) -> Update {
    let builds = vec![Build::from_nvr(nvr).unwrap()];
    Update {
        id: 0,
        alias: alias.to_string(),
        title: title_for(&builds),
        status: UpdateStatus::Pending,
        request: UpdateRequest::Testing,
        locked: false,
        pushed: false,
        update_type: UpdateType::Bugfix,
        severity: UpdateSeverity::Unspecified,
        suggest: UpdateSuggestion::Unspecified,
        notes: String::new(),
        user: user.to_string(),
        release: release.to_string(),
        critpath: false,
        karma: 0,
        test_gating_status: TestGatingStatus::Waiting,
        date_submitted: Utc::now() - Duration::days(days_ago),
        date_modified: None,
        date_approved: None,
        date_pushed: None,
        builds,
        bugs: Vec::new(),
        cves: Vec::new(),
        comments: Vec::new(),
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(request(Method::GET, uri, None, None))
        .await
        .unwrap()
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    app.clone()
        .oneshot(request(Method::GET, uri, Some(token), None))
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(request(Method::POST, uri, token, Some(&body)))
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
