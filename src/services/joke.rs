// Dad joke client (icanhazdadjoke.com) and its short-lived result cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Deserialize;

use super::cache::TtlCache;
use crate::metrics;

pub const DEFAULT_JOKE_API_URL: &str = "https://icanhazdadjoke.com/";
pub const JOKE_TIMEOUT: Duration = Duration::from_secs(10);
pub const JOKE_CACHE_TTL: Duration = Duration::from_secs(5);

/// The fetch takes no arguments, so every result shares one slot.
pub const JOKE_CACHE_KEY: &str = "dad-joke";

/// Failure to obtain a joke from the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JokeError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Failed to decode JSON response: {0}")]
    Decode(String),
    #[error("API returned valid response but no joke text found.")]
    MissingJoke,
    /// The API answered with an error status. Unlike the variants above this
    /// is not treated as the joke service being unreachable.
    #[error("API returned status {0}")]
    Status(u16),
}

impl JokeError {
    /// Human-readable description used in logs and 503 bodies.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// Anything that can produce a joke.
pub trait JokeSource: Send + Sync {
    fn fetch_joke(&self) -> BoxFuture<'_, Result<String, JokeError>>;
}

#[derive(Debug, Deserialize)]
struct DadJokeResponse {
    joke: Option<String>,
}

/// Fetches a random joke over HTTP.
#[derive(Debug, Clone)]
pub struct DadJokeClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl DadJokeClient {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            timeout: JOKE_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self) -> Result<String, JokeError> {
        tracing::info!("Fetching dad joke from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(JokeError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(transport_error)?;
        parse_joke(&body)
    }
}

impl JokeSource for DadJokeClient {
    fn fetch_joke(&self) -> BoxFuture<'_, Result<String, JokeError>> {
        Box::pin(async move {
            let result = self.fetch().await;
            match &result {
                Ok(_) => tracing::info!("Dad joke fetched successfully"),
                Err(e) => {
                    metrics::UPSTREAM_ERRORS_TOTAL
                        .with_label_values(&["joke"])
                        .inc();
                    tracing::error!("Dad joke API request failed: {e}");
                }
            }
            result
        })
    }
}

fn transport_error(e: reqwest::Error) -> JokeError {
    if e.is_timeout() {
        JokeError::Timeout(e.to_string())
    } else {
        JokeError::Request(e.to_string())
    }
}

/// Extract the joke text from an icanhazdadjoke JSON body.
pub fn parse_joke(body: &str) -> Result<String, JokeError> {
    let parsed: DadJokeResponse =
        serde_json::from_str(body).map_err(|e| JokeError::Decode(e.to_string()))?;
    match parsed.joke {
        Some(joke) if !joke.is_empty() => Ok(joke),
        _ => Err(JokeError::MissingJoke),
    }
}

/// Wraps a joke source with a single-slot TTL cache.
///
/// Concurrent misses wait on one refresh so only one upstream call is made
/// per expiry window. Requests that queued behind a failed refresh get that
/// failure back instead of each trying again. Failures are not cached for
/// later callers.
pub struct CachedJokeSource<S> {
    inner: S,
    cache: TtlCache<&'static str, String>,
    /// Completed upstream fetches.
    fetches: AtomicU64,
    /// Held across the upstream call; holds the last fetch's error, if any.
    refresh: tokio::sync::Mutex<Option<JokeError>>,
}

impl<S: JokeSource> CachedJokeSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::new(ttl),
            fetches: AtomicU64::new(0),
            refresh: tokio::sync::Mutex::new(None),
        }
    }

    async fn get_or_fetch(&self) -> Result<String, JokeError> {
        if let Some(joke) = self.cache.get(&JOKE_CACHE_KEY) {
            metrics::JOKE_FETCHES_TOTAL.with_label_values(&["cache"]).inc();
            tracing::debug!("Returning cached dad joke");
            return Ok(joke);
        }

        let seen = self.fetches.load(Ordering::Acquire);
        let mut last_error = self.refresh.lock().await;
        // Another request may have refreshed the slot while we waited.
        if let Some(joke) = self.cache.get(&JOKE_CACHE_KEY) {
            metrics::JOKE_FETCHES_TOTAL.with_label_values(&["cache"]).inc();
            return Ok(joke);
        }
        if self.fetches.load(Ordering::Acquire) != seen {
            if let Some(e) = last_error.as_ref() {
                tracing::debug!("Sharing failed dad joke fetch with waiting request");
                return Err(e.clone());
            }
        }

        metrics::JOKE_FETCHES_TOTAL
            .with_label_values(&["upstream"])
            .inc();
        let result = self.inner.fetch_joke().await;
        self.fetches.fetch_add(1, Ordering::Release);
        match &result {
            Ok(joke) => {
                self.cache.set(JOKE_CACHE_KEY, joke.clone());
                *last_error = None;
            }
            Err(e) => *last_error = Some(e.clone()),
        }
        result
    }
}

impl<S: JokeSource> JokeSource for CachedJokeSource<S> {
    fn fetch_joke(&self) -> BoxFuture<'_, Result<String, JokeError>> {
        Box::pin(self.get_or_fetch())
    }
}
