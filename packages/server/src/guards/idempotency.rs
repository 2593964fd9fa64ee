use std::future::Future;
use std::time::{Duration, Instant};

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::extractors::idempotency::IdempotencyKey;

/// Header set on responses served from the idempotency cache.
pub const REPLAYED_HEADER: &str = "Idempotent-Replayed";

/// How long a request may stay in flight before its key is considered abandoned.
const IN_FLIGHT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
enum Slot {
    InFlight { started: Instant },
    Completed {
        status: StatusCode,
        body: Value,
        stored: Instant,
    },
}

/// A response previously produced for the same idempotency key.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Outcome of claiming an idempotency key.
#[derive(Debug, Clone, PartialEq)]
pub enum Begin {
    /// No live entry: the caller owns the key and must `complete` or `abandon` it.
    Fresh,
    /// The request already succeeded; serve this instead of running it again.
    Replay(CachedResponse),
    /// Another request with the same key is still running.
    InFlight,
}

/// TTL cache of responses keyed by `(user_id, Idempotency-Key)`.
pub struct IdempotencyStore {
    entries: DashMap<(i32, String), Slot>,
    ttl: Duration,
}

impl IdempotencyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        match slot {
            Slot::InFlight { started } => now.duration_since(*started) >= IN_FLIGHT_TIMEOUT,
            Slot::Completed { stored, .. } => now.duration_since(*stored) >= self.ttl,
        }
    }

    pub fn begin(&self, user_id: i32, key: &str) -> Begin {
        let now = Instant::now();
        match self.entries.entry((user_id, key.to_string())) {
            Entry::Occupied(mut occupied) => {
                if self.is_expired(occupied.get(), now) {
                    occupied.insert(Slot::InFlight { started: now });
                    return Begin::Fresh;
                }
                match occupied.get() {
                    Slot::InFlight { .. } => Begin::InFlight,
                    Slot::Completed { status, body, .. } => Begin::Replay(CachedResponse {
                        status: *status,
                        body: body.clone(),
                    }),
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::InFlight { started: now });
                Begin::Fresh
            }
        }
    }

    /// Record the successful response for a key claimed with [`begin`](Self::begin).
    pub fn complete(&self, user_id: i32, key: &str, status: StatusCode, body: Value) {
        self.entries.insert(
            (user_id, key.to_string()),
            Slot::Completed {
                status,
                body,
                stored: Instant::now(),
            },
        );
    }

    /// Release a key after a failed request so the client may retry it.
    pub fn abandon(&self, user_id: i32, key: &str) {
        self.entries
            .remove_if(&(user_id, key.to_string()), |_, slot| {
                matches!(slot, Slot::InFlight { .. })
            });
    }

    /// Remove expired entries and return how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !self.is_expired(slot, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run `op` at most once per idempotency key.
///
/// Without a key the operation simply runs. With a key, a completed earlier
/// run is replayed verbatim, a concurrent run yields `409`, and a failure
/// releases the key.
pub async fn run_idempotent<F, Fut, T>(
    store: &IdempotencyStore,
    user_id: i32,
    key: Option<IdempotencyKey>,
    op: F,
) -> Result<Response, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(StatusCode, T), AppError>>,
    T: Serialize,
{
    let Some(IdempotencyKey(key)) = key else {
        let (status, body) = op().await?;
        return Ok((status, Json(body)).into_response());
    };

    match store.begin(user_id, &key) {
        Begin::Replay(cached) => {
            debug!(user_id, key = %key, "Replaying idempotent response");
            return Ok((
                cached.status,
                [(REPLAYED_HEADER, "true")],
                Json(cached.body),
            )
                .into_response());
        }
        Begin::InFlight => {
            return Err(AppError::Conflict(
                "A request with this Idempotency-Key is already being processed".into(),
            ));
        }
        Begin::Fresh => {}
    }

    match op().await {
        Ok((status, body)) => {
            let value = match serde_json::to_value(&body) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Failed to cache idempotent response");
                    store.abandon(user_id, &key);
                    return Ok((status, Json(body)).into_response());
                }
            };
            store.complete(user_id, &key, status, value.clone());
            Ok((status, Json(value)).into_response())
        }
        Err(e) => {
            store.abandon(user_id, &key);
            Err(e)
        }
    }
}
