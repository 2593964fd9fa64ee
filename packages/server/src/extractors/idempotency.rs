use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// A validated `Idempotency-Key` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey(pub String);

impl IdempotencyKey {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let key = raw.trim();
        if key.is_empty() || key.len() > 255 {
            return Err(AppError::Validation(
                "Idempotency-Key must be 1-255 characters".into(),
            ));
        }
        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(AppError::Validation(
                "Idempotency-Key must contain only visible ASCII characters".into(),
            ));
        }
        Ok(Self(key.to_string()))
    }
}

/// Optional `Idempotency-Key` header. A present but malformed header is rejected.
pub struct MaybeIdempotencyKey(pub Option<IdempotencyKey>);

impl<S> FromRequestParts<S> for MaybeIdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.headers.get(IDEMPOTENCY_HEADER) {
            None => Ok(Self(None)),
            Some(value) => {
                let raw = value.to_str().map_err(|_| {
                    AppError::Validation("Idempotency-Key must be valid ASCII".into())
                })?;
                Ok(Self(Some(IdempotencyKey::parse(raw)?)))
            }
        }
    }
}
