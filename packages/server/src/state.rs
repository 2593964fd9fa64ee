use std::sync::Arc;
use std::time::Duration;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::guards::idempotency::IdempotencyStore;
use crate::guards::rate_limit::RateLimiter;
use crate::guards::registration_lock::RegistrationLock;
use crate::notify::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
    pub idempotency: Arc<IdempotencyStore>,
    pub registration_lock: Arc<RegistrationLock>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Assemble the state, sizing the in-memory guards from `config`.
    pub fn new(
        config: AppConfig,
        db: DatabaseConnection,
        store: Arc<dyn ObjectStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let idempotency = IdempotencyStore::new(Duration::from_secs(config.idempotency.ttl_secs));
        let registration_lock =
            RegistrationLock::new(Duration::from_secs(config.idempotency.lock_ttl_secs));
        let rate_limiter = RateLimiter::new(
            config.rate_limit.capacity,
            config.rate_limit.refill_per_second,
        );

        Self {
            db,
            config: Arc::new(config),
            store,
            mailer,
            idempotency: Arc::new(idempotency),
            registration_lock: Arc::new(registration_lock),
            rate_limiter: Arc::new(rate_limiter),
        }
    }
}
