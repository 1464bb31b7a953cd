//! # JSON Transport
//!
//! HTTP access to the REST backend.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   send ──► 2xx ──────────────────────────────► Ok(json | null)          │
//! │     │                                                                   │
//! │     ├──► 401 / 403 / 404 / other 4xx ────────► Err (no retry)           │
//! │     │                                                                   │
//! │     └──► 5xx / connect error / timeout                                  │
//! │              │                                                          │
//! │              ▼                                                          │
//! │         retries left? ──yes──► sleep(backoff) ──► send again            │
//! │              │                                                          │
//! │              no ──► Err                                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiSettings;
use crate::error::{ClientError, ClientResult};

/// JSON request/response seam between `Api` and the network.
#[async_trait]
pub trait JsonTransport: Send + Sync {
    async fn get(&self, path: &str, params: &[(String, String)]) -> ClientResult<Value>;
    async fn post(&self, path: &str, body: &Value) -> ClientResult<Value>;
    async fn put(&self, path: &str, body: &Value) -> ClientResult<Value>;
    async fn delete(&self, path: &str) -> ClientResult<Value>;

    /// Bearer token for subsequent requests; `None` signs out.
    fn set_token(&self, _token: Option<String>) {}
}

// =============================================================================
// Retry Policy
// =============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 0 disables retrying.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

impl From<&ApiSettings> for RetryPolicy {
    fn from(settings: &ApiSettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_secs(settings.max_backoff_secs),
        }
    }
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// `reqwest`-backed transport with bearer auth and retries.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    retry: RetryPolicy,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(settings: &ApiSettings) -> ClientResult<Self> {
        let timeout = settings.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("estoque/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client: {e}")))?;

        Ok(HttpTransport {
            client,
            base_url: Url::parse(&settings.base_url)?,
            timeout,
            retry: RetryPolicy::from(settings),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn url_for(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let url = self.url_for(path)?;
        let mut backoff = self.retry.create_backoff();
        let mut attempt = 0u32;

        loop {
            match self.send_once(method.clone(), url.clone(), params, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let wait = backoff.next_backoff().unwrap_or(self.retry.max_backoff);
                    warn!(
                        %method,
                        path,
                        attempt,
                        ?wait,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: Url,
        params: &[(String, String)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        debug!(%method, %url, "HTTP request");

        let mut request = self.client.request(method, url);
        if !params.is_empty() {
            request = request.query(params);
        }
        let token = self.token.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.map_reqwest(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_reqwest(e))?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        Err(ClientError::from_status(status.as_u16(), error_message(&text)))
    }

    fn map_reqwest(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout)
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl JsonTransport for HttpTransport {
    async fn get(&self, path: &str, params: &[(String, String)]) -> ClientResult<Value> {
        self.request(Method::GET, path, params, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> ClientResult<Value> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &str) -> ClientResult<Value> {
        self.request(Method::DELETE, path, &[], None).await
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }
}

/// Pulls a readable message out of an error body: `{"error": ..}`,
/// `{"message": ..}`, or the raw text.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["error", "message"] {
            if let Some(Value::String(msg)) = map.get(field) {
                return msg.clone();
            }
        }
    }
    body.trim().to_string()
}
