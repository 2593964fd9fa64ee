//! Process-local guards against duplicate or abusive requests.
//!
//! None of these survive a restart or coordinate across instances; the
//! database unique indexes remain the source of truth for duplicates.

pub mod idempotency;
pub mod rate_limit;
pub mod registration_lock;

use std::time::Duration;

use tracing::debug;

use crate::state::AppState;

/// Periodically drop expired idempotency entries, locks and idle buckets.
pub async fn run_sweeper(state: AppState, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let idempotency = state.idempotency.purge_expired();
        let locks = state.registration_lock.purge_expired();
        let buckets = state.rate_limiter.purge_idle();
        if idempotency + locks + buckets > 0 {
            debug!(idempotency, locks, buckets, "Swept expired guard entries");
        }
    }
}
