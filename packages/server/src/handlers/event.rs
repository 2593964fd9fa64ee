use std::collections::HashMap;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use common::{SubmissionKind, VerificationStatus};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::{info, instrument};

use super::registration::{delete_object_best_effort, require_file};
use crate::entity::{event, event_registration, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::idempotency::MaybeIdempotencyKey;
use crate::extractors::json::ValidJson;
use crate::guards::idempotency::run_idempotent;
use crate::guards::registration_lock::LockTarget;
use crate::models::event::*;
use crate::models::registration::PaymentProofResponse;
use crate::notify;
use crate::state::AppState;
use crate::upload;
use crate::utils::token;

const TICKET_CODE_ATTEMPTS: usize = 5;

#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    operation_id = "listEvents",
    summary = "List active events",
    description = "Public. Active events ordered by start time, with remaining seats.",
    responses(
        (status = 200, description = "Events", body = Vec<EventResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventResponse>>, AppError> {
    let events = event::Entity::find()
        .filter(event::Column::IsActive.eq(true))
        .order_by_asc(event::Column::StartsAt)
        .all(&state.db)
        .await?;

    let taken = taken_seats(&state.db, events.iter().map(|e| e.id).collect()).await?;
    let data = events
        .into_iter()
        .map(|e| {
            let count = taken.get(&e.id).copied().unwrap_or(0);
            EventResponse::new(e, count)
        })
        .collect();

    Ok(Json(data))
}

#[utoipa::path(
    get,
    path = "/api/v1/events/{slug}",
    tag = "Events",
    operation_id = "getEvent",
    summary = "Get an active event",
    params(("slug" = String, Path, description = "Event slug")),
    responses(
        (status = 200, description = "Event", body = EventResponse),
        (status = 404, description = "Unknown or inactive event (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(slug = %slug))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<EventResponse>, AppError> {
    let model = find_active_event(&state.db, &slug).await?;
    let taken = taken_seats(&state.db, vec![model.id]).await?;
    let count = taken.get(&model.id).copied().unwrap_or(0);
    Ok(Json(EventResponse::new(model, count)))
}

#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    operation_id = "createEvent",
    summary = "Create an event",
    description = "Requires `event:manage`. Slugs are unique.",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Slug already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(slug = %payload.slug))]
pub async fn create_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("event:manage")?;

    let model = event::ActiveModel {
        slug: Set(payload.slug),
        title: Set(payload.title.trim().to_string()),
        kind: Set(payload.kind),
        description: Set(payload.description),
        venue: Set(payload.venue.trim().to_string()),
        starts_at: Set(payload.starts_at),
        ends_at: Set(payload.ends_at),
        capacity: Set(payload.capacity),
        price: Set(payload.price),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("An event with this slug already exists".into())
        }
        _ => AppError::from(e),
    })?;

    Ok((StatusCode::CREATED, Json(EventResponse::new(model, 0))))
}

#[utoipa::path(
    post,
    path = "/api/v1/events/{slug}/register",
    tag = "Events",
    operation_id = "registerTicket",
    summary = "Get a ticket for an event",
    description = "One ticket per user per event. Seats are counted over pending and approved tickets. Free events are approved at once and carry a ticket code; paid tickets stay pending until a payment proof is verified. \
        Send an `Idempotency-Key` header to make retries safe.",
    params(
        ("slug" = String, Path, description = "Event slug"),
        ("Idempotency-Key" = Option<String>, Header, description = "Client-chosen key, 1-255 visible ASCII characters"),
    ),
    request_body = RegisterTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = TicketResponse),
        (status = 400, description = "Validation error or event over (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already holding a ticket, event full, or request in progress (CONFLICT)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, key, payload), fields(user_id = auth_user.user_id, slug = %slug))]
pub async fn register_ticket(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    MaybeIdempotencyKey(key): MaybeIdempotencyKey,
    ValidJson(payload): ValidJson<RegisterTicketRequest>,
) -> Result<Response, AppError> {
    let user_id = auth_user.user_id;
    run_idempotent(&state.idempotency, user_id, key, || {
        create_ticket(&state, user_id, &slug, payload)
    })
    .await
}

async fn create_ticket(
    state: &AppState,
    user_id: i32,
    slug: &str,
    payload: RegisterTicketRequest,
) -> Result<(StatusCode, TicketResponse), AppError> {
    let found = find_active_event(&state.db, slug).await?;
    let now = Utc::now();
    if found.ends_at <= now {
        return Err(AppError::Validation(format!("{} has already ended", found.title)));
    }

    let _guard = state
        .registration_lock
        .try_acquire(user_id, LockTarget::Event(found.id))
        .ok_or_else(|| {
            AppError::Conflict("A ticket request for this event is already in progress".into())
        })?;

    let txn = state.db.begin().await?;

    // Serializes seat counting for this event.
    let locked = event::Entity::find_by_id(found.id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;

    let existing = event_registration::Entity::find()
        .filter(event_registration::Column::EventId.eq(locked.id))
        .filter(event_registration::Column::UserId.eq(user_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "You already have a ticket for this event".into(),
        ));
    }

    if let Some(capacity) = locked.capacity {
        let taken = event_registration::Entity::find()
            .filter(event_registration::Column::EventId.eq(locked.id))
            .filter(event_registration::Column::Status.ne(VerificationStatus::Rejected))
            .count(&txn)
            .await?;
        if taken >= std::cmp::Ord::max(capacity, 0) as u64 {
            return Err(AppError::Conflict(format!("{} is full", locked.title)));
        }
    }

    let account = user::Entity::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    let free = locked.price == 0;
    let ticket_code = if free {
        Some(issue_ticket_code(&txn).await?)
    } else {
        None
    };

    let ticket = event_registration::ActiveModel {
        event_id: Set(locked.id),
        user_id: Set(user_id),
        attendee_name: Set(payload
            .attendee_name
            .map(|n| n.trim().to_string())
            .unwrap_or(account.name)),
        attendee_email: Set(account.email),
        status: Set(if free {
            VerificationStatus::Approved
        } else {
            VerificationStatus::Pending
        }),
        amount_due: Set(locked.price),
        payment_proof_key: Set(None),
        payment_uploaded_at: Set(None),
        ticket_code: Set(ticket_code),
        checked_in_at: Set(None),
        verified_by: Set(None),
        verified_at: Set(free.then_some(now)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("You already have a ticket for this event".into())
        }
        _ => AppError::from(e),
    })?;

    txn.commit().await?;

    info!(ticket_id = ticket.id, event = %locked.slug, free, "Ticket created");
    if let Some(code) = &ticket.ticket_code {
        notify::spawn_send(
            state.mailer.clone(),
            notify::ticket_issued(&ticket.attendee_email, &locked.title, code),
        );
    }

    Ok((StatusCode::CREATED, TicketResponse::new(ticket, &locked)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tickets",
    tag = "Events",
    operation_id = "listMyTickets",
    summary = "List the caller's tickets",
    responses(
        (status = 200, description = "Tickets, newest first", body = Vec<TicketResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_my_tickets(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TicketResponse>>, AppError> {
    let tickets = event_registration::Entity::find()
        .filter(event_registration::Column::UserId.eq(auth_user.user_id))
        .order_by_desc(event_registration::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(ticket_responses(&state.db, tickets).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/tickets/{id}/payment",
    tag = "Events",
    operation_id = "uploadTicketPayment",
    summary = "Upload a ticket payment proof",
    description = "Multipart field `file`: JPEG, PNG, WebP or PDF up to 5 MiB. Owner only, while the ticket is pending.",
    params(("id" = i32, Path, description = "Ticket ID")),
    request_body(content_type = "multipart/form-data", description = "Payment proof file"),
    responses(
        (status = 200, description = "Proof stored", body = PaymentProofResponse),
        (status = 400, description = "Invalid file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Ticket is no longer pending (CONFLICT)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id))]
pub async fn upload_ticket_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<PaymentProofResponse>, AppError> {
    let ticket = find_ticket(&state.db, id).await?;
    if ticket.user_id != auth_user.user_id {
        return Err(AppError::NotFound("Ticket not found".into()));
    }
    ensure_ticket_pending(ticket.status)?;

    let kind = SubmissionKind::PaymentProof;
    let form = upload::read_form(multipart, kind.max_size()).await?;
    let file = upload::validate_file(kind, require_file(form.file)?)?;

    let key = upload::ticket_payment_key(id, &file.extension);
    state.store.put(&key, &file.data, file.content_type).await?;

    let now = Utc::now();
    let result: Result<Option<String>, AppError> = async {
        let txn = state.db.begin().await?;
        let locked = find_ticket_for_update(&txn, id).await?;
        ensure_ticket_pending(locked.status)?;
        let previous = locked.payment_proof_key.clone();

        let mut active: event_registration::ActiveModel = locked.into();
        active.payment_proof_key = Set(Some(key.clone()));
        active.payment_uploaded_at = Set(Some(now));
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(previous)
    }
    .await;

    match result {
        Ok(Some(old)) => delete_object_best_effort(&state, &old).await,
        Ok(None) => {}
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
    path = "/api/v1/tickets/{id}/payment",
    tag = "Events",
    operation_id = "downloadTicketPayment",
    summary = "Download a ticket payment proof",
    description = "Owner or `ticket:verify`.",
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or no proof uploaded (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn download_ticket_payment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let ticket = find_ticket(&state.db, id).await?;
    if ticket.user_id != auth_user.user_id && !auth_user.has_permission("ticket:verify") {
        return Err(AppError::NotFound("Ticket not found".into()));
    }
    let key = ticket
        .payment_proof_key
        .ok_or_else(|| AppError::NotFound("No payment proof uploaded".into()))?;
    let ext = crate::utils::filename::extension(&key).unwrap_or_else(|| "bin".into());

    upload::object_response(&*state.store, &key, &format!("ticket-payment-{id}.{ext}")).await
}

/// Draw ticket codes until one is unused. The unique index stays the backstop.
pub(crate) async fn issue_ticket_code<C: ConnectionTrait>(db: &C) -> Result<String, AppError> {
    for _ in 0..TICKET_CODE_ATTEMPTS {
        let code = token::ticket_code();
        let taken = event_registration::Entity::find()
            .filter(event_registration::Column::TicketCode.eq(&code))
            .one(db)
            .await?
            .is_some();
        if !taken {
            return Ok(code);
        }
    }
    Err(AppError::Internal(
        "Could not allocate a unique ticket code".into(),
    ))
}

/// Attach event slug and title to each ticket.
pub(crate) async fn ticket_responses<C: ConnectionTrait>(
    db: &C,
    tickets: Vec<event_registration::Model>,
) -> Result<Vec<TicketResponse>, AppError> {
    if tickets.is_empty() {
        return Ok(Vec::new());
    }
    let event_ids: Vec<i32> = tickets.iter().map(|t| t.event_id).collect();
    let events: HashMap<i32, event::Model> = event::Entity::find()
        .filter(event::Column::Id.is_in(event_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|e| (e.id, e))
        .collect();

    tickets
        .into_iter()
        .map(|t| {
            let event = events
                .get(&t.event_id)
                .ok_or_else(|| AppError::Internal(format!("Ticket {} has no event", t.id)))?;
            Ok(TicketResponse::new(t, event))
        })
        .collect()
}

#[derive(Debug, FromQueryResult)]
struct SeatCount {
    event_id: i32,
    taken: i64,
}

/// Pending plus approved tickets per event.
pub(crate) async fn taken_seats<C: ConnectionTrait>(
    db: &C,
    event_ids: Vec<i32>,
) -> Result<HashMap<i32, i64>, AppError> {
    if event_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = event_registration::Entity::find()
        .select_only()
        .column(event_registration::Column::EventId)
        .column_as(event_registration::Column::Id.count(), "taken")
        .filter(event_registration::Column::EventId.is_in(event_ids))
        .filter(event_registration::Column::Status.ne(VerificationStatus::Rejected))
        .group_by(event_registration::Column::EventId)
        .into_model::<SeatCount>()
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|r| (r.event_id, r.taken)).collect())
}

pub(crate) async fn find_active_event<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<event::Model, AppError> {
    event::Entity::find()
        .filter(event::Column::Slug.eq(slug.trim()))
        .filter(event::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

pub(crate) async fn find_ticket<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<event_registration::Model, AppError> {
    event_registration::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".into()))
}

pub(crate) async fn find_ticket_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<event_registration::Model, AppError> {
    event_registration::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".into()))
}

fn ensure_ticket_pending(status: VerificationStatus) -> Result<(), AppError> {
    if status != VerificationStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Payment proof cannot be changed once the ticket is {status}"
        )));
    }
    Ok(())
}
