use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Shortest time a bucket is kept after its last use.
const MIN_IDLE_EVICTION: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Per-client token bucket.
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
    capacity: f64,
    refill_per_second: f64,
}

impl RateLimiter {
    /// A `capacity` of 0 disables limiting.
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity: f64::from(capacity),
            refill_per_second,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0.0
    }

    /// Take one token for `key`, or return the seconds to wait for the next one.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        if !self.is_enabled() {
            return Ok(());
        }

        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        if self.refill_per_second <= 0.0 {
            return Err(60);
        }
        let wait = (1.0 - bucket.tokens) / self.refill_per_second;
        Err((wait.ceil() as u64).max(1))
    }

    /// How long a bucket must sit unused before dropping it is the same as
    /// refilling it. Without refill a bucket never recovers, so it is kept.
    fn idle_window(&self) -> Duration {
        if self.refill_per_second <= 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64(self.capacity / self.refill_per_second)
            .map_or(Duration::MAX, |full| full.max(MIN_IDLE_EVICTION))
    }

    /// Drop buckets idle long enough to have refilled completely.
    pub fn purge_idle(&self) -> usize {
        self.purge_idle_at(Instant::now())
    }

    fn purge_idle_at(&self, now: Instant) -> usize {
        let window = self.idle_window();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, b| now.saturating_duration_since(b.last_refill) < window);
        before.saturating_sub(self.buckets.len())
    }
}

/// Identify the caller: first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// the socket peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware rejecting callers that exhausted their bucket with `429`.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.rate_limiter.is_enabled() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let key = client_key(request.headers(), peer);

    match state.rate_limiter.check(&key) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            AppError::RateLimited { retry_after }.into_response()
        }
    }
}
