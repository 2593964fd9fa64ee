use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::state::AppState;

pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Caller presented `X-Webhook-Secret` matching `webhook.secret`.
#[derive(Debug)]
pub struct WebhookAuth;

/// Caller presented `Authorization: Bearer <cron.secret>`.
#[derive(Debug)]
pub struct CronAuth;

/// Compare digests so the check does not short-circuit on the first
/// differing byte. An empty `expected` never matches.
fn secret_matches(presented: &str, expected: &str) -> bool {
    !expected.is_empty() && Sha256::digest(presented) == Sha256::digest(expected)
}

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        if secret_matches(presented, &state.config.webhook.secret) {
            Ok(WebhookAuth)
        } else {
            Err(AppError::TokenInvalid)
        }
    }
}

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        if secret_matches(presented, &state.config.cron.secret) {
            Ok(CronAuth)
        } else {
            Err(AppError::TokenInvalid)
        }
    }
}
