// In-memory per-client rate limiter for the public API routes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Rate-limited routes, each with its own quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitType {
    Score,
    Play,
    Chat,
    Joke,
}

impl RateLimitType {
    /// Maximum number of requests allowed in the window.
    pub fn max_count(&self) -> usize {
        match self {
            RateLimitType::Score => 60,
            RateLimitType::Play => 15,
            RateLimitType::Chat => 15,
            RateLimitType::Joke => 15,
        }
    }

    /// Time window for the rate limit.
    pub fn window(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Route label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RateLimitType::Score => "score",
            RateLimitType::Play => "play",
            RateLimitType::Chat => "chat",
            RateLimitType::Joke => "joke",
        }
    }
}

impl std::fmt::Display for RateLimitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} per 1 minute", self.max_count())
    }
}

/// Error returned when a rate limit is exceeded.
#[derive(Debug, Clone)]
pub struct RateLimitError {
    pub limit_type: RateLimitType,
    pub max: usize,
    /// Time until the oldest counted request leaves the window.
    pub retry_after: Duration,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rate limit exceeded: {}", self.limit_type)
    }
}

impl std::error::Error for RateLimitError {}

/// Key for the rate limit map: (client address, route).
type LimitKey = (String, RateLimitType);

/// How often keys with no requests left in their window are dropped.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct LimiterState {
    entries: HashMap<LimitKey, Vec<Instant>>,
    last_sweep: Instant,
}

impl LimiterState {
    /// Drop every key whose requests have all left the window.
    fn sweep(&mut self, now: Instant) {
        self.entries.retain(|(_, limit_type), times| {
            let window = limit_type.window();
            times.retain(|t| now.duration_since(*t) < window);
            !times.is_empty()
        });
        self.last_sweep = now;
    }
}

/// Thread-safe sliding-window rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<LimiterState>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimiterState {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    /// Check if the client is within the rate limit for the given route.
    /// If within limits, records the request and returns Ok(()).
    pub fn check_limit(&self, client: &str, limit_type: RateLimitType) -> Result<(), RateLimitError> {
        self.check_limit_at(client, limit_type, Instant::now())
    }

    fn check_limit_at(
        &self,
        client: &str,
        limit_type: RateLimitType,
        now: Instant,
    ) -> Result<(), RateLimitError> {
        let mut state = self.inner.lock().unwrap();
        if now.duration_since(state.last_sweep) >= SWEEP_INTERVAL {
            state.sweep(now);
        }

        let window = limit_type.window();
        let max = limit_type.max_count();

        let entries = state
            .entries
            .entry((client.to_string(), limit_type))
            .or_insert_with(Vec::new);

        // Remove expired entries
        entries.retain(|t| now.duration_since(*t) < window);

        if entries.len() >= max {
            let retry_after = entries
                .first()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return Err(RateLimitError {
                limit_type,
                max,
                retry_after,
            });
        }

        entries.push(now);
        Ok(())
    }

    /// Get the current count for a client and route (for testing/diagnostics).
    pub fn current_count(&self, client: &str, limit_type: RateLimitType) -> usize {
        let mut state = self.inner.lock().unwrap();
        let key = (client.to_string(), limit_type);
        let window = limit_type.window();
        let now = Instant::now();

        let Some(entries) = state.entries.get_mut(&key) else {
            return 0;
        };
        entries.retain(|t| now.duration_since(*t) < window);
        let count = entries.len();
        if count == 0 {
            state.entries.remove(&key);
        }
        count
    }

    /// Number of (client, route) pairs currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::new();

        // Score allows 60 per minute
        for _ in 0..60 {
            assert!(limiter.check_limit("10.0.0.1", RateLimitType::Score).is_ok());
        }
    }

    #[test]
    fn test_rate_limiter_denies_over_limit() {
        let limiter = RateLimiter::new();

        for _ in 0..15 {
            assert!(limiter.check_limit("10.0.0.1", RateLimitType::Play).is_ok());
        }
        // 16th should fail
        let result = limiter.check_limit("10.0.0.1", RateLimitType::Play);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.max, 15);
        assert_eq!(err.limit_type, RateLimitType::Play);
        assert!(err.retry_after <= Duration::from_secs(60));
    }

    #[test]
    fn test_rate_limiter_separate_clients() {
        let limiter = RateLimiter::new();

        for _ in 0..15 {
            assert!(limiter.check_limit("10.0.0.1", RateLimitType::Chat).is_ok());
        }
        assert!(limiter.check_limit("10.0.0.1", RateLimitType::Chat).is_err());

        // Another client should still be fine
        assert!(limiter.check_limit("10.0.0.2", RateLimitType::Chat).is_ok());
    }

    #[test]
    fn test_rate_limiter_separate_routes() {
        let limiter = RateLimiter::new();

        for _ in 0..15 {
            assert!(limiter.check_limit("10.0.0.1", RateLimitType::Play).is_ok());
        }
        assert!(limiter.check_limit("10.0.0.1", RateLimitType::Play).is_err());

        // Chat and score quotas are independent
        assert!(limiter.check_limit("10.0.0.1", RateLimitType::Chat).is_ok());
        assert!(limiter.check_limit("10.0.0.1", RateLimitType::Score).is_ok());
    }

    #[test]
    fn test_rate_limiter_window_slides() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for _ in 0..15 {
            assert!(limiter
                .check_limit_at("10.0.0.1", RateLimitType::Play, start)
                .is_ok());
        }
        assert!(limiter
            .check_limit_at("10.0.0.1", RateLimitType::Play, start + Duration::from_secs(59))
            .is_err());

        // Once the first batch ages out, requests are allowed again
        assert!(limiter
            .check_limit_at("10.0.0.1", RateLimitType::Play, start + Duration::from_secs(60))
            .is_ok());
    }

    #[test]
    fn test_rejected_requests_are_not_counted() {
        let limiter = RateLimiter::new();
        for _ in 0..20 {
            let _ = limiter.check_limit("10.0.0.1", RateLimitType::Chat);
        }
        assert_eq!(limiter.current_count("10.0.0.1", RateLimitType::Chat), 15);
    }

    #[test]
    fn test_rate_limiter_current_count() {
        let limiter = RateLimiter::new();

        assert_eq!(limiter.current_count("10.0.0.1", RateLimitType::Score), 0);

        limiter.check_limit("10.0.0.1", RateLimitType::Score).unwrap();
        assert_eq!(limiter.current_count("10.0.0.1", RateLimitType::Score), 1);

        limiter.check_limit("10.0.0.1", RateLimitType::Score).unwrap();
        assert_eq!(limiter.current_count("10.0.0.1", RateLimitType::Score), 2);
    }

    #[test]
    fn test_idle_clients_are_forgotten() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for i in 0..10_000 {
            let client = format!("10.{}.{}.{}", i / 65_536, (i / 256) % 256, i % 256);
            assert!(limiter
                .check_limit_at(&client, RateLimitType::Score, start)
                .is_ok());
        }
        assert_eq!(limiter.tracked_keys(), 10_000);

        let later = start + Duration::from_secs(3600);
        assert!(limiter
            .check_limit_at("192.0.2.1", RateLimitType::Chat, later)
            .is_ok());
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_sweep_keeps_clients_inside_their_window() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        limiter
            .check_limit_at("10.0.0.1", RateLimitType::Play, start)
            .unwrap();
        limiter
            .check_limit_at("10.0.0.2", RateLimitType::Play, start + Duration::from_secs(30))
            .unwrap();

        // Sweeps at +60s: the first client's request has aged out, the second's hasn't.
        limiter
            .check_limit_at("10.0.0.3", RateLimitType::Play, start + Duration::from_secs(60))
            .unwrap();
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_rate_limit_error_display() {
        let err = RateLimitError {
            limit_type: RateLimitType::Chat,
            max: 15,
            retry_after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded: 15 per 1 minute");
    }
}
