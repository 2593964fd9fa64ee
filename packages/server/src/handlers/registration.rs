use std::collections::HashMap;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::{Phase, RegistrationSource, SubmissionKind, VerificationStatus};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, instrument, warn};

use super::competition::{find_active_competition, find_competition};
use crate::entity::{competition, competition_registration, phase_submission, referral_code, team_member};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::idempotency::MaybeIdempotencyKey;
use crate::extractors::json::ValidJson;
use crate::guards::idempotency::run_idempotent;
use crate::guards::registration_lock::LockTarget;
use crate::models::registration::*;
use crate::models::shared::normalize_email;
use crate::notify;
use crate::state::AppState;
use crate::upload::{self, RawFile};

#[utoipa::path(
    post,
    path = "/api/v1/competitions/{code}/register",
    tag = "Registrations",
    operation_id = "registerTeam",
    summary = "Register a team for a competition",
    description = "Creates a pending registration with its members. Send an `Idempotency-Key` header to make retries safe: a repeated key replays the first response with `Idempotent-Replayed: true`. \
        A user may register once per competition, and a leader email may lead only one team per competition. A valid referral code discounts the fee.",
    params(
        ("code" = String, Path, description = "Competition code"),
        ("Idempotency-Key" = Option<String>, Header, description = "Client-chosen key, 1-255 visible ASCII characters"),
    ),
    request_body = RegisterTeamRequest,
    responses(
        (status = 201, description = "Registration created", body = RegistrationResponse),
        (status = 400, description = "Validation error, registration closed or bad referral code (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Competition not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already registered, leader taken, or request in progress (CONFLICT)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, key, payload), fields(user_id = auth_user.user_id, code = %code))]
pub async fn register_team(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(code): Path<String>,
    MaybeIdempotencyKey(key): MaybeIdempotencyKey,
    ValidJson(payload): ValidJson<RegisterTeamRequest>,
) -> Result<Response, AppError> {
    let user_id = auth_user.user_id;
    run_idempotent(&state.idempotency, user_id, key, || {
        create_team_registration(&state, user_id, &code, payload)
    })
    .await
}

async fn create_team_registration(
    state: &AppState,
    user_id: i32,
    code: &str,
    payload: RegisterTeamRequest,
) -> Result<(StatusCode, RegistrationResponse), AppError> {
    let competition = find_active_competition(&state.db, code).await?;

    if !competition.accepts_registrations(Utc::now()) {
        return Err(AppError::Validation(format!(
            "Registration for {} is closed",
            competition.code
        )));
    }

    let _guard = state
        .registration_lock
        .try_acquire(user_id, LockTarget::Competition(competition.id))
        .ok_or_else(|| {
            AppError::Conflict("A registration for this competition is already in progress".into())
        })?;

    let txn = state.db.begin().await?;
    let (registration, members) = insert_registration(
        &txn,
        &competition,
        NewRegistration {
            user_id,
            team_name: &payload.team_name,
            members: &payload.members,
            referral_code: payload.referral_code.as_deref(),
            source: RegistrationSource::Web,
        },
    )
    .await?;
    txn.commit().await?;

    info!(
        registration_id = registration.id,
        competition = %competition.code,
        "Team registered"
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
        RegistrationResponse::new(registration, competition.code, members),
    ))
}

pub(crate) struct NewRegistration<'a> {
    pub user_id: i32,
    pub team_name: &'a str,
    pub members: &'a [MemberInput],
    pub referral_code: Option<&'a str>,
    pub source: RegistrationSource,
}

/// Insert a registration with its members inside `txn`.
///
/// Enforces team size bounds, one registration per user per competition, one
/// team per leader email, and referral code availability. Callers validate
/// the member list shape beforehand.
pub(crate) async fn insert_registration(
    txn: &DatabaseTransaction,
    competition: &competition::Model,
    new: NewRegistration<'_>,
) -> Result<(competition_registration::Model, Vec<team_member::Model>), AppError> {
    let size = new.members.len() as i32;
    if size < competition.min_team_size || size > competition.max_team_size {
        return Err(AppError::Validation(format!(
            "{} teams must have {}-{} members",
            competition.code, competition.min_team_size, competition.max_team_size
        )));
    }

    let leader = new
        .members
        .iter()
        .find(|m| m.is_leader)
        .ok_or_else(|| AppError::Validation("Exactly one member must be the team leader".into()))?;
    let leader_email = normalize_email(&leader.email);

    let already_registered = competition_registration::Entity::find()
        .filter(competition_registration::Column::UserId.eq(new.user_id))
        .filter(competition_registration::Column::CompetitionId.eq(competition.id))
        .one(txn)
        .await?;
    if already_registered.is_some() {
        return Err(AppError::Conflict(format!(
            "You are already registered for {}",
            competition.code
        )));
    }

    let leader_taken = competition_registration::Entity::find()
        .filter(competition_registration::Column::CompetitionId.eq(competition.id))
        .filter(competition_registration::Column::LeaderEmail.eq(&leader_email))
        .one(txn)
        .await?;
    if leader_taken.is_some() {
        return Err(AppError::Conflict(format!(
            "{leader_email} already leads a team in {}",
            competition.code
        )));
    }

    let now = Utc::now();
    let (referral, amount_due) = match new.referral_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            let referral = referral_code::Entity::find_by_id(code.to_uppercase())
                .lock(LockType::Update)
                .one(txn)
                .await?
                .filter(|r| r.is_usable(now))
                .ok_or_else(|| {
                    AppError::Validation("Referral code is invalid or no longer available".into())
                })?;
            let amount = referral_code::apply_discount(
                competition.registration_fee,
                referral.discount_percent,
            );
            let code = referral.code.clone();
            let used_count = referral.used_count + 1;
            let mut active: referral_code::ActiveModel = referral.into();
            active.used_count = Set(used_count);
            active.update(txn).await?;
            (Some(code), amount)
        }
        None => (None, competition.registration_fee),
    };

    let registration = competition_registration::ActiveModel {
        user_id: Set(new.user_id),
        competition_id: Set(competition.id),
        team_name: Set(new.team_name.trim().to_string()),
        leader_email: Set(leader_email),
        status: Set(VerificationStatus::Pending),
        phase: Set(Phase::Registration),
        qualified: Set(false),
        rejection_reason: Set(None),
        referral_code: Set(referral),
        amount_due: Set(amount_due),
        payment_proof_key: Set(None),
        payment_uploaded_at: Set(None),
        verified_by: Set(None),
        verified_at: Set(None),
        source: Set(new.source),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::Conflict(format!(
                "A registration for {} already exists for this user or leader",
                competition.code
            ))
        }
        _ => AppError::from(e),
    })?;

    let mut members = Vec::with_capacity(new.members.len());
    for (position, member) in new.members.iter().enumerate() {
        let model = team_member::ActiveModel {
            registration_id: Set(registration.id),
            name: Set(member.name.trim().to_string()),
            email: Set(normalize_email(&member.email)),
            phone: Set(member.phone.as_deref().map(str::trim).map(str::to_string)),
            institution: Set(member.institution.as_deref().map(str::trim).map(str::to_string)),
            is_leader: Set(member.is_leader),
            position: Set(position as i32),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        members.push(model);
    }

    Ok((registration, members))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations",
    tag = "Registrations",
    operation_id = "listMyRegistrations",
    summary = "List the caller's registrations",
    responses(
        (status = 200, description = "Registrations, newest first", body = Vec<RegistrationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_my_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    let registrations = competition_registration::Entity::find()
        .filter(competition_registration::Column::UserId.eq(auth_user.user_id))
        .order_by_desc(competition_registration::Column::CreatedAt)
        .all(&state.db)
        .await?;

    if registrations.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let ids: Vec<i32> = registrations.iter().map(|r| r.id).collect();
    let mut members_by_reg: HashMap<i32, Vec<team_member::Model>> = HashMap::new();
    for member in team_member::Entity::find()
        .filter(team_member::Column::RegistrationId.is_in(ids))
        .order_by_asc(team_member::Column::Position)
        .all(&state.db)
        .await?
    {
        members_by_reg
            .entry(member.registration_id)
            .or_default()
            .push(member);
    }

    let competition_ids: Vec<i32> = registrations.iter().map(|r| r.competition_id).collect();
    let codes: HashMap<i32, String> = competition::Entity::find()
        .filter(competition::Column::Id.is_in(competition_ids))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.code))
        .collect();

    let data = registrations
        .into_iter()
        .map(|r| {
            let code = codes.get(&r.competition_id).cloned().unwrap_or_default();
            let members = members_by_reg.remove(&r.id).unwrap_or_default();
            RegistrationResponse::new(r, code, members)
        })
        .collect();

    Ok(Json(data))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations/{id}",
    tag = "Registrations",
    operation_id = "getRegistration",
    summary = "Get a registration",
    description = "Visible to its owner and to holders of `registration:view`. Others receive 404.",
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Registration", body = RegistrationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_registration(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let registration = find_visible_registration(&state.db, &auth_user, id).await?;
    Ok(Json(registration_response(&state.db, registration).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/payment",
    tag = "Registrations",
    operation_id = "uploadRegistrationPayment",
    summary = "Upload a payment proof",
    description = "Multipart field `file`: JPEG, PNG, WebP or PDF up to 5 MiB. Owner only, while the registration is pending. Replaces any earlier proof.",
    params(("id" = i32, Path, description = "Registration ID")),
    request_body(content_type = "multipart/form-data", description = "Payment proof file"),
    responses(
        (status = 200, description = "Proof stored", body = PaymentProofResponse),
        (status = 400, description = "Invalid file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Registration is no longer pending (CONFLICT)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id))]
pub async fn upload_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<PaymentProofResponse>, AppError> {
    let registration = find_owned_registration(&state.db, &auth_user, id).await?;
    ensure_pending(registration.status)?;

    let kind = SubmissionKind::PaymentProof;
    let form = upload::read_form(multipart, kind.max_size()).await?;
    let file = upload::validate_file(kind, require_file(form.file)?)?;

    let key = upload::registration_payment_key(id, &file.extension);
    state.store.put(&key, &file.data, file.content_type).await?;

    let now = Utc::now();
    let result: Result<Option<String>, AppError> = async {
        let txn = state.db.begin().await?;
        let locked = find_registration_for_update(&txn, id).await?;
        ensure_pending(locked.status)?;
        let previous = locked.payment_proof_key.clone();

        let mut active: competition_registration::ActiveModel = locked.into();
        active.payment_proof_key = Set(Some(key.clone()));
        active.payment_uploaded_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(previous)
    }
    .await;

    match result {
        Ok(previous) => {
            if let Some(old) = previous {
                delete_object_best_effort(&state, &old).await;
            }
        }
        Err(e) => {
            delete_object_best_effort(&state, &key).await;
            return Err(e);
        }
    }

    Ok(Json(PaymentProofResponse {
        id,
        size: file.size(),
        checksum: file.checksum.to_hex(),
        filename: file.filename,
        content_type: file.content_type.to_string(),
        uploaded_at: now,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations/{id}/payment",
    tag = "Registrations",
    operation_id = "downloadRegistrationPayment",
    summary = "Download the payment proof",
    description = "Streams the stored proof. Owner or `registration:view`.",
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or no proof uploaded (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn download_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let registration = find_visible_registration(&state.db, &auth_user, id).await?;
    let key = registration
        .payment_proof_key
        .ok_or_else(|| AppError::NotFound("No payment proof uploaded".into()))?;
    let ext = crate::utils::filename::extension(&key).unwrap_or_else(|| "bin".into());

    upload::object_response(&*state.store, &key, &format!("payment-proof-{id}.{ext}")).await
}

#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/submissions",
    tag = "Registrations",
    operation_id = "submitPhaseFile",
    summary = "Upload a phase deliverable",
    description = "Multipart fields `kind` (`abstract`, `paper` or `pitch_deck`) and `file`. Owner only. The registration must be approved and its current phase still open. Uploading the same kind again in the same phase replaces the earlier file.",
    params(("id" = i32, Path, description = "Registration ID")),
    request_body(content_type = "multipart/form-data", description = "Submission kind and file"),
    responses(
        (status = 201, description = "Submission stored", body = SubmissionResponse),
        (status = 200, description = "Earlier submission replaced", body = SubmissionResponse),
        (status = 400, description = "Invalid kind or file, or phase closed (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Registration not approved (CONFLICT)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id))]
pub async fn submit_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let registration = find_owned_registration(&state.db, &auth_user, id).await?;
    if registration.status != VerificationStatus::Approved {
        return Err(AppError::Conflict(
            "Files can only be submitted for approved registrations".into(),
        ));
    }

    let form = upload::read_form(multipart, state.config.storage.max_upload_size).await?;
    let kind: SubmissionKind = form
        .fields
        .get("kind")
        .ok_or_else(|| AppError::Validation("Field 'kind' is required".into()))?
        .trim()
        .parse()
        .map_err(|e: common::status::ParseEnumError| AppError::Validation(e.to_string()))?;
    if kind == SubmissionKind::PaymentProof {
        return Err(AppError::Validation(
            "Payment proofs are uploaded through the payment endpoint".into(),
        ));
    }

    let competition = find_competition(&state.db, registration.competition_id).await?;
    let phase = registration.phase;
    let now = Utc::now();
    if !competition.schedule().is_open(phase, now) {
        return Err(AppError::Validation(format!(
            "The {phase} phase is closed for submissions"
        )));
    }

    let file = upload::validate_file(kind, require_file(form.file)?)?;
    let key = upload::submission_key(id, phase, kind, &file.extension);
    state.store.put(&key, &file.data, file.content_type).await?;

    let result: Result<(phase_submission::Model, Option<String>), AppError> = async {
        let txn = state.db.begin().await?;
        let existing = phase_submission::Entity::find()
            .filter(phase_submission::Column::RegistrationId.eq(id))
            .filter(phase_submission::Column::Phase.eq(phase))
            .filter(phase_submission::Column::Kind.eq(kind))
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        let (model, previous) = match existing {
            Some(existing) => {
                let previous = existing.storage_key.clone();
                let mut active: phase_submission::ActiveModel = existing.into();
                active.storage_key = Set(key.clone());
                active.filename = Set(file.filename.clone());
                active.content_type = Set(file.content_type.to_string());
                active.size = Set(file.size());
                active.checksum = Set(file.checksum.to_hex());
                active.submitted_at = Set(now);
                (active.update(&txn).await?, Some(previous))
            }
            None => {
                let model = phase_submission::ActiveModel {
                    registration_id: Set(id),
                    phase: Set(phase),
                    kind: Set(kind),
                    storage_key: Set(key.clone()),
                    filename: Set(file.filename.clone()),
                    content_type: Set(file.content_type.to_string()),
                    size: Set(file.size()),
                    checksum: Set(file.checksum.to_hex()),
                    submitted_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|e| match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
                        "Another upload for this submission is in progress".into(),
                    ),
                    _ => AppError::from(e),
                })?;
                (model, None)
            }
        };
        txn.commit().await?;
        Ok((model, previous))
    }
    .await;

    let (model, previous) = match result {
        Ok(ok) => ok,
        Err(e) => {
            delete_object_best_effort(&state, &key).await;
            return Err(e);
        }
    };

    let status = if let Some(old) = previous {
        delete_object_best_effort(&state, &old).await;
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    info!(registration_id = id, %phase, %kind, "Submission stored");
    Ok((status, Json(SubmissionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/registrations/{id}/submissions",
    tag = "Registrations",
    operation_id = "listSubmissions",
    summary = "List a registration's submissions",
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Submissions", body = Vec<SubmissionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn list_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<SubmissionResponse>>, AppError> {
    find_visible_registration(&state.db, &auth_user, id).await?;
    let submissions = load_submissions(&state.db, id).await?;
    Ok(Json(submissions.into_iter().map(Into::into).collect()))
}

pub(crate) async fn load_submissions<C: ConnectionTrait>(
    db: &C,
    registration_id: i32,
) -> Result<Vec<phase_submission::Model>, AppError> {
    Ok(phase_submission::Entity::find()
        .filter(phase_submission::Column::RegistrationId.eq(registration_id))
        .order_by_asc(phase_submission::Column::SubmittedAt)
        .all(db)
        .await?)
}

/// Build the owner-facing view: competition code plus ordered members.
pub(crate) async fn registration_response<C: ConnectionTrait>(
    db: &C,
    registration: competition_registration::Model,
) -> Result<RegistrationResponse, AppError> {
    let competition = find_competition(db, registration.competition_id).await?;
    let members = team_member::Entity::find()
        .filter(team_member::Column::RegistrationId.eq(registration.id))
        .order_by_asc(team_member::Column::Position)
        .all(db)
        .await?;
    Ok(RegistrationResponse::new(registration, competition.code, members))
}

pub(crate) async fn find_registration<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<competition_registration::Model, AppError> {
    competition_registration::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration not found".into()))
}

pub(crate) async fn find_registration_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<competition_registration::Model, AppError> {
    competition_registration::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration not found".into()))
}

/// Owner or `registration:view`; anyone else gets 404 to avoid enumeration.
async fn find_visible_registration<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<competition_registration::Model, AppError> {
    let registration = find_registration(db, id).await?;
    if registration.user_id != auth_user.user_id && !auth_user.has_permission("registration:view") {
        return Err(AppError::NotFound("Registration not found".into()));
    }
    Ok(registration)
}

async fn find_owned_registration<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<competition_registration::Model, AppError> {
    let registration = find_registration(db, id).await?;
    if registration.user_id != auth_user.user_id {
        return Err(AppError::NotFound("Registration not found".into()));
    }
    Ok(registration)
}

fn ensure_pending(status: VerificationStatus) -> Result<(), AppError> {
    if status != VerificationStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Payment proof cannot be changed once the registration is {status}"
        )));
    }
    Ok(())
}

pub(crate) fn require_file(file: Option<RawFile>) -> Result<RawFile, AppError> {
    file.ok_or_else(|| AppError::Validation("Field 'file' is required".into()))
}

pub(crate) async fn delete_object_best_effort(state: &AppState, key: &str) {
    if let Err(e) = state.store.delete(key).await {
        warn!(key, error = %e, "Failed to delete stored object");
    }
}
