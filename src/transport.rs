//! Transport Module
//!
//! The boundary between the cache and the remote API. The cache only needs
//! "send method + path, get status + body back"; `HttpTransport` provides
//! that over reqwest.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Header carrying a queued operation's idempotency key on replay.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

// == Request ==
/// A request relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: String,
    /// Path beginning with `/`
    pub endpoint: String,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            body: None,
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new("GET", endpoint)
    }

    pub fn with_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// == Response ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status_code: u16,
    pub body: Vec<u8>,
    pub headers: HashMap<String, Vec<String>>,
}

impl TransportResponse {
    pub fn new(status_code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

// == Transport Trait ==
/// Performs requests against the remote API.
///
/// Implementations return `Err` only when no response was received; HTTP
/// error statuses come back as `Ok` with the status set.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

// == HTTP Transport ==
/// reqwest-backed transport bound to one base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with a default per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nexcache/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout,
        })
    }

    /// Attaches `Authorization: Bearer <token>` to every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| CacheError::InvalidRequest(format!("invalid method {}", request.method)))?;
        let url = self.url_for(&request.endpoint);

        let mut builder = self
            .client
            .request(method, &url)
            .timeout(request.timeout.unwrap_or(self.timeout));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status_code = response.status().as_u16();

        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers
                    .entry(name.as_str().to_string())
                    .or_default()
                    .push(value.to_string());
            }
        }

        let body = response.bytes().await?.to_vec();
        debug!(url = %url, status = status_code, bytes = body.len(), "Remote call finished");

        Ok(TransportResponse {
            status_code,
            body,
            headers,
        })
    }
}
