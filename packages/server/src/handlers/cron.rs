use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::secret::CronAuth;
use crate::jobs::{PhaseTransitionReport, run_phase_transition};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/cron/phase-transition",
    tag = "Cron",
    operation_id = "runPhaseTransition",
    summary = "Run the phase transition now",
    description = "For external schedulers. Requires `Authorization: Bearer <cron.secret>`; an empty configured secret rejects every call. Also served on GET.",
    responses(
        (status = 200, description = "Scan report", body = PhaseTransitionReport),
        (status = 401, description = "Missing or wrong secret (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn phase_transition(
    _auth: CronAuth,
    State(state): State<AppState>,
) -> Result<Json<PhaseTransitionReport>, AppError> {
    let report = run_phase_transition(&state.db, Utc::now())
        .await
        .map_err(|e| AppError::Internal(format!("Phase transition failed: {e:#}")))?;
    Ok(Json(report))
}
