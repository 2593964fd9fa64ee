pub mod auth;
pub mod idempotency;
pub mod json;
pub mod secret;
