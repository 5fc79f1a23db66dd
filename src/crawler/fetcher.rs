//! Rate-limited, retrying request pipeline
//!
//! This module handles every outbound request of the crawl, including:
//! - Building the HTTP client with the API token header
//! - Waiting on the shared token bucket before each attempt
//! - Classifying response statuses
//! - Linear backoff and retry for recoverable failures

use crate::crawler::limiter::TokenBucket;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Header carrying the API token
const TOKEN_HEADER: &str = "X-Riot-Token";

/// Why an attempt was retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// HTTP 429: the external quota is exhausted for now
    RateExceeded,

    /// Transient 5xx failure on the server side
    ServerUnavailable(u16),
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateExceeded => write!(f, "rate limit exceeded"),
            Self::ServerUnavailable(status) => write!(f, "server unavailable ({})", status),
        }
    }
}

/// Errors surfaced by the request pipeline
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Non-recoverable status {status} for {url}")]
    PermanentClient { url: String, status: u16 },

    #[error("Maximum attempts ({attempts}) reached for {url}, last failure: {last}")]
    AttemptsExhausted {
        url: String,
        attempts: u32,
        last: RetryReason,
    },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Raw response handed back by a transport
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a single GET request; no retries, no rate limiting
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, RequestError>;
}

/// Transport backed by a reqwest client
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, RequestError> {
        let transport_error = |e: reqwest::Error| {
            let message = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            RequestError::Transport {
                url: url.to_string(),
                message,
            }
        };

        let response = self.client.get(url).send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        Ok(RawResponse { status, body })
    }
}

/// Builds an HTTP client that sends the API token with every request
///
/// An empty token is accepted so the client can be pointed at local mocks.
pub fn build_http_client(api_key: &str) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if !api_key.is_empty() {
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert(TOKEN_HEADER, value);
        } else {
            tracing::warn!("API key contains invalid header characters, sending none");
        }
    }

    Client::builder()
        .user_agent(concat!("league-crawler/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Bounded retry policy with linear backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempt ceiling per request
    pub max_attempts: u32,

    /// Backoff after attempt `n` is `unit * 10 * n`
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    /// Delay after the given (1-based) failed attempt: 10, 20, 30, ... units
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(10u32.saturating_mul(attempt))
    }
}

/// What a status code means for the attempt loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Retry(RetryReason),
    Abort,
}

/// Maps a response status to the action the attempt loop takes
///
/// | Status | Action |
/// |--------|--------|
/// | 2xx | Return the response |
/// | 429 | Back off, retry |
/// | 5xx | Back off, retry |
/// | 403 and anything else | Abort with `PermanentClient` |
fn classify(status: u16) -> Outcome {
    match status {
        200..=299 => Outcome::Success,
        429 => Outcome::Retry(RetryReason::RateExceeded),
        500..=599 => Outcome::Retry(RetryReason::ServerUnavailable(status)),
        _ => Outcome::Abort,
    }
}

/// Issues requests through the shared limiter with bounded retries
pub struct RequestPipeline {
    transport: Arc<dyn Transport>,
    limiter: Arc<TokenBucket>,
    policy: RetryPolicy,
}

impl RequestPipeline {
    pub fn new(transport: Arc<dyn Transport>, limiter: Arc<TokenBucket>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            limiter,
            policy,
        }
    }

    /// Fetches `url` with the configured attempt ceiling
    pub async fn fetch(&self, url: &str) -> Result<String, RequestError> {
        self.fetch_with_attempts(url, self.policy.max_attempts).await
    }

    /// Fetches `url`, making at most `max_attempts` attempts
    ///
    /// Every attempt first waits on the shared token bucket. Transport
    /// failures are returned immediately; the caller decides whether to
    /// try again later.
    pub async fn fetch_with_attempts(
        &self,
        url: &str,
        max_attempts: u32,
    ) -> Result<String, RequestError> {
        let max_attempts = max_attempts.max(1);
        let mut last = RetryReason::RateExceeded;

        for attempt in 1..=max_attempts {
            self.limiter.acquire().await;
            let response = self.transport.get(url).await?;

            match classify(response.status) {
                Outcome::Success => return Ok(response.body),
                Outcome::Abort => {
                    tracing::warn!(
                        "Non-recoverable status {} for url {}",
                        response.status,
                        url
                    );
                    return Err(RequestError::PermanentClient {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Outcome::Retry(reason) => {
                    last = reason;
                    if attempt == max_attempts {
                        break;
                    }
                    let delay = self.policy.backoff_for(attempt);
                    tracing::warn!(
                        "Temporary error ({}) at attempt {} for url {}, retrying in {:?}",
                        reason,
                        attempt,
                        url,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        tracing::error!(
            "Maximum attempts ({}) reached, could not retrieve {}",
            max_attempts,
            url
        );
        Err(RequestError::AttemptsExhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last,
        })
    }

    /// Fetches `url` and decodes the JSON body
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RequestError> {
        let body = self.fetch(url).await?;
        serde_json::from_str(&body).map_err(|e| RequestError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
