use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use crate::entity::referral_code;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::ValidJson;
use crate::models::referral::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/referral-codes/{code}",
    tag = "Referral Codes",
    operation_id = "checkReferralCode",
    summary = "Check a referral code",
    description = "Public. Returns the discount when the code is active, unexpired and has uses left; otherwise 404.",
    params(("code" = String, Path, description = "Referral code, case-insensitive")),
    responses(
        (status = 200, description = "Usable code", body = ReferralCodeResponse),
        (status = 404, description = "Unknown or unusable code (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(code = %code))]
pub async fn get_referral_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ReferralCodeResponse>, AppError> {
    let model = referral_code::Entity::find_by_id(code.trim().to_uppercase())
        .one(&state.db)
        .await?
        .filter(|r| r.is_usable(Utc::now()))
        .ok_or_else(|| AppError::NotFound("Referral code not found".into()))?;

    Ok(Json(ReferralCodeResponse {
        code: model.code,
        discount_percent: model.discount_percent,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/referral-codes",
    tag = "Referral Codes",
    operation_id = "createReferralCode",
    summary = "Create a referral code",
    description = "Requires `referral:manage`. Codes are stored uppercase.",
    request_body = CreateReferralCodeRequest,
    responses(
        (status = 201, description = "Code created", body = AdminReferralCodeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Code already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(code = %payload.code))]
pub async fn create_referral_code(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateReferralCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("referral:manage")?;

    let model = referral_code::ActiveModel {
        code: Set(payload.code.trim().to_uppercase()),
        discount_percent: Set(payload.discount_percent),
        max_uses: Set(payload.max_uses),
        used_count: Set(0),
        is_active: Set(payload.is_active.unwrap_or(true)),
        expires_at: Set(payload.expires_at),
        created_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("This referral code already exists".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((
        StatusCode::CREATED,
        Json(AdminReferralCodeResponse::from(model)),
    ))
}
