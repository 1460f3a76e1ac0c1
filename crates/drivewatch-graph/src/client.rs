//! Microsoft Graph API client
//!
//! Typed HTTP client for the Microsoft Graph API. Handles the bearer
//! header, endpoint construction, classification of HTTP outcomes into the
//! gateway error taxonomy, and retry with exponential backoff for
//! throttled (429) and transient (5xx / network) failures.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivewatch_graph::client::GraphClient;
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), drivewatch_core::ports::GatewayError> {
//! let client = GraphClient::new("bearer-token-here");
//! let response = client.execute_with_retry(Method::GET, "/me", None).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use drivewatch_core::ports::GatewayError;

/// Base URL for Microsoft Graph API v1.0
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Maximum number of attempts for retryable failures
const MAX_ATTEMPTS: u32 = 5;

/// First backoff step; doubles per attempt
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Ceiling for a single backoff sleep
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Fallback when a 429 carries no usable Retry-After header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Per-request deadline; an expired deadline surfaces as a transient
/// error and the pass aborts without advancing the cursor
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn build_http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("failed to build HTTP client")
}

/// Parse a Retry-After header value (delta-seconds form)
///
/// Falls back to `default` when the value is not a plain second count.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Exponential backoff delay for the given zero-based attempt
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    BACKOFF_BASE.saturating_mul(factor).min(BACKOFF_CAP)
}

/// Map a non-retryable HTTP status into the gateway error taxonomy
///
/// Retryable statuses (429, 5xx) never reach this function; they are
/// absorbed by the retry loop.
pub fn fail_status(status: StatusCode) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::AuthInvalid,
        s => GatewayError::Fatal(format!("provider returned {s}")),
    }
}

/// HTTP client for Microsoft Graph API calls
pub struct GraphClient {
    http: Client,
    base_url: String,
    bearer: String,
}

impl GraphClient {
    /// Creates a new client with the given bearer credential
    pub fn new(bearer: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: GRAPH_BASE_URL.to_string(),
            bearer: bearer.into(),
        }
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(bearer: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: build_http_client(),
            base_url: base_url.into(),
            bearer: bearer.into(),
        }
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for a path relative to the
    /// base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http.request(method, &url).bearer_auth(&self.bearer)
    }

    /// Creates an authenticated request builder for an absolute URL
    ///
    /// Delta continuation links are absolute URLs, so they bypass the base
    /// URL entirely.
    pub fn request_absolute(&self, method: Method, url: &str) -> RequestBuilder {
        self.http.request(method, url).bearer_auth(&self.bearer)
    }

    /// Sends a single request without retry and returns the raw outcome
    ///
    /// Used by the identity probe, which must never block on backoff and
    /// maps every outcome itself.
    pub async fn send_once(
        &self,
        method: Method,
        path: &str,
    ) -> Result<Response, reqwest::Error> {
        self.request(method, path).send().await
    }

    /// Executes a request with retry for 429 and transient failures
    ///
    /// - 429: honours `Retry-After` when present, otherwise a default
    ///   backoff, then retries up to [`MAX_ATTEMPTS`].
    /// - 5xx and network errors: exponential backoff, same attempt cap.
    /// - Everything else (success included) is returned to the caller
    ///   unmapped; use [`fail_status`] for non-success statuses.
    ///
    /// `path_or_url` may be a relative path or an absolute URL; `body` is
    /// re-serialized on every attempt.
    pub async fn execute_with_retry(
        &self,
        method: Method,
        path_or_url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, GatewayError> {
        let mut last_error: Option<GatewayError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            let mut builder = if path_or_url.starts_with("http://")
                || path_or_url.starts_with("https://")
            {
                self.request_absolute(method.clone(), path_or_url)
            } else {
                self.request(method.clone(), path_or_url)
            };
            if let Some(json) = body {
                builder = builder.json(json);
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(target = path_or_url, attempt, error = %e, "Request failed to send");
                    last_error = Some(GatewayError::Transient(e.to_string()));
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                info!(
                    target = path_or_url,
                    attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Throttled by provider, backing off"
                );

                last_error = Some(GatewayError::RateLimited {
                    retry_after: Some(retry_after),
                });
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if status.is_server_error() {
                warn!(target = path_or_url, attempt, status = %status, "Server error, backing off");
                last_error = Some(GatewayError::Transient(format!(
                    "provider returned {status}"
                )));
                tokio::time::sleep(backoff_delay(attempt)).await;
                continue;
            }

            if attempt > 0 {
                debug!(target = path_or_url, attempt, "Request succeeded after retry");
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or_else(|| {
            GatewayError::Transient(format!("retries exhausted for {path_or_url}"))
        }))
    }
}
