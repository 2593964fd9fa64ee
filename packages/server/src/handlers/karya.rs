use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use sea_orm::*;
use tracing::{info, instrument};

use crate::config::VotingConfig;
use crate::entity::{karya, karya_vote};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::ValidJson;
use crate::models::karya::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/karya",
    tag = "Karya",
    operation_id = "listKarya",
    summary = "List showcased works",
    description = "Public. Entries with their vote counts, most votes first.",
    responses(
        (status = 200, description = "Entries", body = Vec<KaryaResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_karya(
    State(state): State<AppState>,
) -> Result<Json<Vec<KaryaResponse>>, AppError> {
    let entries = karya::Entity::find()
        .select_only()
        .column(karya::Column::Id)
        .column(karya::Column::Title)
        .column(karya::Column::TeamName)
        .column(karya::Column::Description)
        .column(karya::Column::CreatedAt)
        .column_as(karya_vote::Column::UserId.count(), "votes")
        .left_join(karya_vote::Entity)
        .group_by(karya::Column::Id)
        .order_by(karya_vote::Column::UserId.count(), Order::Desc)
        .order_by_asc(karya::Column::Id)
        .into_model::<KaryaResponse>()
        .all(&state.db)
        .await?;

    Ok(Json(entries))
}

#[utoipa::path(
    post,
    path = "/api/v1/karya",
    tag = "Karya",
    operation_id = "createKarya",
    summary = "Add a showcased work",
    description = "Requires `karya:manage`.",
    request_body = CreateKaryaRequest,
    responses(
        (status = 201, description = "Entry created", body = KaryaResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_karya(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateKaryaRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("karya:manage")?;

    let model = karya::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        team_name: Set(payload.team_name.trim().to_string()),
        description: Set(payload.description),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(KaryaResponse {
            id: model.id,
            title: model.title,
            team_name: model.team_name,
            description: model.description,
            votes: 0,
            created_at: model.created_at,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/karya/{id}/vote",
    tag = "Karya",
    operation_id = "voteKarya",
    summary = "Vote for a work",
    description = "Each account votes once in total. Only accepted inside the configured voting window.",
    params(("id" = i32, Path, description = "Karya ID")),
    responses(
        (status = 201, description = "Vote recorded", body = VoteResponse),
        (status = 400, description = "Voting is not open (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already voted (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn vote(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    ensure_voting_open(&state.config.voting, now)?;

    karya::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Karya not found".into()))?;

    let already_voted = karya_vote::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .is_some();
    if already_voted {
        return Err(AppError::Conflict("You have already voted".into()));
    }

    karya_vote::ActiveModel {
        user_id: Set(auth_user.user_id),
        karya_id: Set(id),
        created_at: Set(now),
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("You have already voted".into())
        }
        _ => AppError::from(e),
    })?;

    let votes = karya_vote::Entity::find()
        .filter(karya_vote::Column::KaryaId.eq(id))
        .count(&state.db)
        .await?;

    info!(karya_id = id, "Vote recorded");
    Ok((
        StatusCode::CREATED,
        Json(VoteResponse {
            karya_id: id,
            votes: votes as i64,
        }),
    ))
}

fn ensure_voting_open(window: &VotingConfig, now: DateTime<Utc>) -> Result<(), AppError> {
    if let Some(opens) = window.opens_at
        && now < opens
    {
        return Err(AppError::Validation("Voting has not opened yet".into()));
    }
    if let Some(closes) = window.closes_at
        && now >= closes
    {
        return Err(AppError::Validation("Voting has closed".into()));
    }
    Ok(())
}
