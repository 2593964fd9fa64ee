use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::RegistrationSource;
use sea_orm::*;
use tracing::{info, instrument};

use super::competition::find_active_competition;
use super::registration::{NewRegistration, insert_registration};
use crate::entity::{role, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::ValidJson;
use crate::extractors::secret::WebhookAuth;
use crate::models::shared::normalize_email;
use crate::models::webhook::*;
use crate::notify;
use crate::state::AppState;
use crate::utils::{hash, token};

#[utoipa::path(
    post,
    path = "/api/v1/webhooks/import-registration",
    tag = "Webhooks",
    operation_id = "importRegistration",
    summary = "Import a registration collected elsewhere",
    description = "Authenticated by the `X-Webhook-Secret` header. The leader's account is found by email or created inactive with an unusable password. \
        Registrations follow the same uniqueness rules as the web flow and are marked with source `import`.",
    params(("X-Webhook-Secret" = String, Header, description = "Shared webhook secret")),
    request_body = ImportRegistrationRequest,
    responses(
        (status = 201, description = "Registration imported", body = ImportRegistrationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Missing or wrong secret (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already registered or leader taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(code = %payload.competition_code))]
pub async fn import_registration(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ImportRegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let competition = find_active_competition(&state.db, &payload.competition_code).await?;
    let members = payload.all_members();
    let leader_email = normalize_email(&payload.leader.email);

    let txn = state.db.begin().await?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&leader_email))
        .one(&txn)
        .await?;
    let (owner, user_created) = match existing {
        Some(owner) => (owner, false),
        None => {
            // Imported leaders get a random password nobody knows.
            let hash = hash::hash_password(&token::random_hex(32))
                .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;
            let owner = user::ActiveModel {
                email: Set(leader_email.clone()),
                name: Set(payload.leader.name.trim().to_string()),
                password: Set(hash),
                role: Set(role::DEFAULT_ROLE.to_string()),
                is_active: Set(false),
                created_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict("Leader account was created concurrently; retry".into())
                }
                _ => AppError::from(e),
            })?;
            (owner, true)
        }
    };

    let (registration, _) = insert_registration(
        &txn,
        &competition,
        NewRegistration {
            user_id: owner.id,
            team_name: &payload.team_name,
            members: &members,
            referral_code: None,
            source: RegistrationSource::Import,
        },
    )
    .await?;
    txn.commit().await?;

    info!(
        registration_id = registration.id,
        user_id = owner.id,
        user_created,
        "Registration imported"
    );
    notify::spawn_send(
        state.mailer.clone(),
        notify::registration_received(
            &registration.leader_email,
            &registration.team_name,
            &competition.code,
            registration.amount_due,
        ),
    );

    Ok((
        StatusCode::CREATED,
        Json(ImportRegistrationResponse {
            registration_id: registration.id,
            user_id: owner.id,
            user_created,
        }),
    ))
}
