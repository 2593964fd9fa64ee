use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::Phase;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::competition;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::ValidJson;
use crate::models::competition::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/competitions",
    tag = "Competitions",
    operation_id = "listCompetitions",
    summary = "List active competitions",
    description = "Public. Returns active competitions ordered by code.",
    responses(
        (status = 200, description = "Active competitions", body = Vec<CompetitionResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_competitions(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompetitionResponse>>, AppError> {
    let competitions = competition::Entity::find()
        .filter(competition::Column::IsActive.eq(true))
        .order_by_asc(competition::Column::Code)
        .all(&state.db)
        .await?;

    Ok(Json(competitions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/competitions/{code}",
    tag = "Competitions",
    operation_id = "getCompetition",
    summary = "Get an active competition by code",
    params(("code" = String, Path, description = "Competition code, case-insensitive")),
    responses(
        (status = 200, description = "Competition details", body = CompetitionResponse),
        (status = 404, description = "Unknown or inactive competition (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(code = %code))]
pub async fn get_competition(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CompetitionResponse>, AppError> {
    let model = find_active_competition(&state.db, &code).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/competitions",
    tag = "Competitions",
    operation_id = "createCompetition",
    summary = "Create a competition",
    description = "Requires `competition:manage`. The code is stored uppercase and must be unique.",
    request_body = CreateCompetitionRequest,
    responses(
        (status = 201, description = "Competition created", body = CompetitionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Code already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(code = %payload.code))]
pub async fn create_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateCompetitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("competition:manage")?;

    let now = Utc::now();
    let new_competition = competition::ActiveModel {
        code: Set(payload.code.trim().to_uppercase()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        registration_fee: Set(payload.registration_fee),
        min_team_size: Set(payload.min_team_size),
        max_team_size: Set(payload.max_team_size),
        is_active: Set(payload.is_active.unwrap_or(true)),
        registration_open: Set(payload.registration_open),
        registration_close: Set(payload.registration_close),
        preliminary_close: Set(payload.preliminary_close),
        semifinal_close: Set(payload.semifinal_close),
        final_close: Set(payload.final_close),
        // The phase-transition job catches up if the schedule has already moved on.
        current_phase: Set(Phase::Registration),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_competition
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("A competition with this code already exists".into())
            }
            _ => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(CompetitionResponse::from(model))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/competitions/{id}",
    tag = "Competitions",
    operation_id = "updateCompetition",
    summary = "Update a competition",
    description = "Partially updates a competition. Requires `competition:manage`. Team size bounds and the phase schedule are re-validated against the stored values. The current phase is left to the phase-transition job.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = UpdateCompetitionRequest,
    responses(
        (status = 200, description = "Competition updated", body = CompetitionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidJson(payload): ValidJson<UpdateCompetitionRequest>,
) -> Result<Json<CompetitionResponse>, AppError> {
    auth_user.require_permission("competition:manage")?;

    if payload == UpdateCompetitionRequest::default() {
        let existing = find_competition(&state.db, id).await?;
        return Ok(Json(existing.into()));
    }

    let txn = state.db.begin().await?;
    let existing = find_competition_for_update(&txn, id).await?;

    validate_team_bounds(
        payload.min_team_size.unwrap_or(existing.min_team_size),
        payload.max_team_size.unwrap_or(existing.max_team_size),
    )?;

    let mut effective = existing.clone();
    if let Some(open) = payload.registration_open {
        effective.registration_open = open;
    }
    if let Some(close) = payload.registration_close {
        effective.registration_close = close;
    }
    if let Some(close) = payload.preliminary_close {
        effective.preliminary_close = close;
    }
    if let Some(close) = payload.semifinal_close {
        effective.semifinal_close = close;
    }
    if let Some(close) = payload.final_close {
        effective.final_close = close;
    }
    validate_schedule(effective.registration_open, &effective.schedule())?;

    let mut active: competition::ActiveModel = existing.into();

    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(fee) = payload.registration_fee {
        active.registration_fee = Set(fee);
    }
    if let Some(min) = payload.min_team_size {
        active.min_team_size = Set(min);
    }
    if let Some(max) = payload.max_team_size {
        active.max_team_size = Set(max);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.registration_open = Set(effective.registration_open);
    active.registration_close = Set(effective.registration_close);
    active.preliminary_close = Set(effective.preliminary_close);
    active.semifinal_close = Set(effective.semifinal_close);
    active.final_close = Set(effective.final_close);
    active.updated_at = Set(Utc::now());

    let model = active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(model.into()))
}

/// Look up an active competition by code (case-insensitive).
pub(crate) async fn find_active_competition<C: ConnectionTrait>(
    db: &C,
    code: &str,
) -> Result<competition::Model, AppError> {
    competition::Entity::find()
        .filter(competition::Column::Code.eq(code.trim().to_uppercase()))
        .filter(competition::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

pub(crate) async fn find_competition<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}

async fn find_competition_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<competition::Model, AppError> {
    competition::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Competition not found".into()))
}
