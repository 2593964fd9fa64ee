use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// What a user is registering for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockTarget {
    Competition(i32),
    Event(i32),
}

type LockKey = (i32, LockTarget);

#[derive(Debug, Clone, Copy)]
struct Holder {
    token: u64,
    acquired: Instant,
}

/// Mutual exclusion for concurrent registration attempts by the same user for
/// the same competition (or event).
///
/// Locks expire after `ttl` so a request that dies without dropping its guard
/// cannot block the user forever.
pub struct RegistrationLock {
    held: Arc<DashMap<LockKey, Holder>>,
    next_token: AtomicU64,
    ttl: Duration,
}

/// Releases the lock when dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct RegistrationGuard {
    held: Arc<DashMap<LockKey, Holder>>,
    key: LockKey,
    token: u64,
}

impl RegistrationLock {
    pub fn new(ttl: Duration) -> Self {
        Self {
            held: Arc::new(DashMap::new()),
            next_token: AtomicU64::new(1),
            ttl,
        }
    }

    /// Take the lock for `(user_id, target)`, or `None` if a live holder exists.
    pub fn try_acquire(&self, user_id: i32, target: LockTarget) -> Option<RegistrationGuard> {
        let key = (user_id, target);
        let now = Instant::now();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let holder = Holder {
            token,
            acquired: now,
        };

        match self.held.entry(key) {
            Entry::Occupied(mut occupied) => {
                if now.duration_since(occupied.get().acquired) < self.ttl {
                    return None;
                }
                occupied.insert(holder);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(holder);
            }
        }

        Some(RegistrationGuard {
            held: Arc::clone(&self.held),
            key,
            token,
        })
    }

    pub fn is_locked(&self, user_id: i32, target: LockTarget) -> bool {
        self.held
            .get(&(user_id, target))
            .is_some_and(|h| h.acquired.elapsed() < self.ttl)
    }

    /// Drop locks whose TTL has passed and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.held.len();
        self.held.retain(|_, h| h.acquired.elapsed() < self.ttl);
        before.saturating_sub(self.held.len())
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        // An expired lock may have been taken over; only release our own.
        self.held.remove_if(&self.key, |_, h| h.token == self.token);
    }
}
