//! In-process mock of the control-plane API
//!
//! Serves `/health` and records every other request. Health and mutation
//! outcomes can be flipped while a test runs.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use nexcache::Config;

pub const TOKEN: &str = "test-token";

/// One request as seen by the mock server.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub path: String,
    pub idempotency_key: Option<String>,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct MockState {
    pub unhealthy: AtomicBool,
    pub reject_mutations: AtomicBool,
    pub received: Mutex<Vec<Received>>,
}

impl MockState {
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.reject_mutations.store(rejecting, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_with(&self, method: &str) -> Vec<Received> {
        self.received()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }
}

pub struct MockServer {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let app = Router::new()
            .route("/health", get(health))
            .fallback(record)
            .layer(TraceLayer::new_for_http())
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Config rooted at `root` pointing at this server, probing on every check.
    pub fn config(&self, root: &std::path::Path) -> Config {
        Config {
            base_url: self.base_url.clone(),
            api_token: Some(TOKEN.to_string()),
            offline_debounce: 0,
            network_timeout: 2,
            request_timeout: 5,
            ..Config::rooted_at(root)
        }
    }
}

async fn health(State(state): State<Arc<MockState>>) -> StatusCode {
    if state.unhealthy.load(Ordering::SeqCst) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

async fn record(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.received.lock().unwrap().push(Received {
        method: method.to_string(),
        path: uri.path().to_string(),
        idempotency_key: header("idempotency-key"),
        authorization: header("authorization"),
        body: body.to_vec(),
    });

    if method != Method::GET && state.reject_mutations.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "unavailable" })),
        );
    }
    (StatusCode::OK, Json(json!({ "path": uri.path() })))
}
