use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Utc;
use common::{Phase, TransactionKind, VerificationStatus};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::*;
use tracing::{info, instrument};

use super::event::{find_ticket_for_update, issue_ticket_code, ticket_responses};
use super::registration::{find_registration_for_update, load_submissions, registration_response};
use crate::entity::{
    competition, competition_registration, event, event_registration, transaction_detail,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::ValidJson;
use crate::models::admin::*;
use crate::models::event::TicketResponse;
use crate::models::registration::{RegistrationResponse, RegistrationSummary};
use crate::models::shared::{Pagination, escape_like, page_offset, page_params};
use crate::notify;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/admin/registrations",
    tag = "Admin",
    operation_id = "adminListRegistrations",
    summary = "List registrations for review",
    description = "Requires `registration:view`. Newest first, filterable by status, competition code, phase and team name.",
    params(AdminRegistrationQuery),
    responses(
        (status = 200, description = "Registrations", body = RegistrationListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_registrations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AdminRegistrationQuery>,
) -> Result<Json<RegistrationListResponse>, AppError> {
    auth_user.require_permission("registration:view")?;

    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = competition_registration::Entity::find().inner_join(competition::Entity);

    if let Some(status) = query.status {
        select = select.filter(competition_registration::Column::Status.eq(status));
    }
    if let Some(phase) = query.phase {
        select = select.filter(competition_registration::Column::Phase.eq(phase));
    }
    if let Some(ref code) = query.competition {
        select = select.filter(competition::Column::Code.eq(code.trim().to_uppercase()));
    }
    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col((
                    competition_registration::Entity,
                    competition_registration::Column::TeamName,
                ))))
                .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let total = select.clone().count(&state.db).await?;

    let data = select
        .select_only()
        .column(competition_registration::Column::Id)
        .column(competition_registration::Column::UserId)
        .column(competition_registration::Column::CompetitionId)
        .column_as(competition::Column::Code, "competition_code")
        .column(competition_registration::Column::TeamName)
        .column(competition_registration::Column::LeaderEmail)
        .column(competition_registration::Column::Status)
        .column(competition_registration::Column::Phase)
        .column(competition_registration::Column::Qualified)
        .column(competition_registration::Column::AmountDue)
        .column(competition_registration::Column::Source)
        .column(competition_registration::Column::CreatedAt)
        .order_by_desc(competition_registration::Column::CreatedAt)
        .order_by_desc(competition_registration::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .into_model::<RegistrationSummary>()
        .all(&state.db)
        .await?;

    Ok(Json(RegistrationListResponse {
        data,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/registrations/{id}",
    tag = "Admin",
    operation_id = "adminGetRegistration",
    summary = "Registration detail for review",
    description = "Requires `registration:view`. Includes members and submissions.",
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Registration detail", body = AdminRegistrationDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_registration_detail(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AdminRegistrationDetail>, AppError> {
    auth_user.require_permission("registration:view")?;

    let registration = super::registration::find_registration(&state.db, id).await?;
    let user_id = registration.user_id;
    let leader_email = registration.leader_email.clone();
    let verified_by = registration.verified_by;
    let verified_at = registration.verified_at;

    let submissions = load_submissions(&state.db, id).await?;
    let registration = registration_response(&state.db, registration).await?;

    Ok(Json(AdminRegistrationDetail {
        registration,
        user_id,
        leader_email,
        verified_by,
        verified_at,
        submissions: submissions.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/registrations/{id}/approve",
    tag = "Admin",
    operation_id = "adminApproveRegistration",
    summary = "Approve a registration",
    description = "Requires `registration:verify`. Only pending registrations with a payment proof (or nothing to pay) can be approved. Records the payment in the transaction ledger.",
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Approved", body = RegistrationResponse),
        (status = 400, description = "No payment proof (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already decided (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, admin_id = auth_user.user_id))]
pub async fn approve_registration(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RegistrationResponse>, AppError> {
    auth_user.require_permission("registration:verify")?;

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let registration = find_registration_for_update(&txn, id).await?;
    ensure_decidable(registration.status, VerificationStatus::Approved, "Registration")?;
    if registration.payment_proof_key.is_none() && registration.amount_due > 0 {
        return Err(AppError::Validation(
            "Cannot approve a registration without a payment proof".into(),
        ));
    }

    let amount = registration.amount_due;
    let mut active: competition_registration::ActiveModel = registration.into();
    active.status = Set(VerificationStatus::Approved);
    active.rejection_reason = Set(None);
    active.verified_by = Set(Some(auth_user.user_id));
    active.verified_at = Set(Some(now));
    active.updated_at = Set(now);
    let registration = active.update(&txn).await?;

    record_transaction(&txn, TransactionKind::Competition, id, amount, auth_user.user_id).await?;
    txn.commit().await?;

    let response = registration_response(&state.db, registration.clone()).await?;
    info!(registration_id = id, "Registration approved");
    notify::spawn_send(
        state.mailer.clone(),
        notify::registration_approved(
            &registration.leader_email,
            &registration.team_name,
            &response.competition_code,
        ),
    );

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/registrations/{id}/reject",
    tag = "Admin",
    operation_id = "adminRejectRegistration",
    summary = "Reject a registration",
    description = "Requires `registration:verify`. Only pending registrations can be rejected; the reason is shown to the team.",
    params(("id" = i32, Path, description = "Registration ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Rejected", body = RegistrationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already decided (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, admin_id = auth_user.user_id))]
pub async fn reject_registration(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ValidJson(payload): ValidJson<RejectRequest>,
) -> Result<Json<RegistrationResponse>, AppError> {
    auth_user.require_permission("registration:verify")?;

    let now = Utc::now();
    let reason = payload.reason.trim().to_string();
    let txn = state.db.begin().await?;
    let registration = find_registration_for_update(&txn, id).await?;
    ensure_decidable(registration.status, VerificationStatus::Rejected, "Registration")?;

    let mut active: competition_registration::ActiveModel = registration.into();
    active.status = Set(VerificationStatus::Rejected);
    active.rejection_reason = Set(Some(reason.clone()));
    active.verified_by = Set(Some(auth_user.user_id));
    active.verified_at = Set(Some(now));
    active.updated_at = Set(now);
    let registration = active.update(&txn).await?;
    txn.commit().await?;

    let response = registration_response(&state.db, registration.clone()).await?;
    info!(registration_id = id, "Registration rejected");
    notify::spawn_send(
        state.mailer.clone(),
        notify::registration_rejected(
            &registration.leader_email,
            &registration.team_name,
            &response.competition_code,
            &reason,
        ),
    );

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/registrations/{id}/qualify",
    tag = "Admin",
    operation_id = "adminQualifyRegistration",
    summary = "Qualify a team for the next phase",
    description = "Requires `registration:verify`. Marks an approved registration to advance at the next phase transition. Teams in the final phase cannot advance.",
    params(("id" = i32, Path, description = "Registration ID")),
    responses(
        (status = 200, description = "Marked as qualified", body = RegistrationResponse),
        (status = 400, description = "Already in the final phase (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Registration not approved (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, admin_id = auth_user.user_id))]
pub async fn qualify_registration(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RegistrationResponse>, AppError> {
    auth_user.require_permission("registration:verify")?;

    let txn = state.db.begin().await?;
    let registration = find_registration_for_update(&txn, id).await?;
    if registration.status != VerificationStatus::Approved {
        return Err(AppError::Conflict(
            "Only approved registrations can qualify".into(),
        ));
    }
    if registration.phase == Phase::Final {
        return Err(AppError::Validation(
            "Teams in the final phase cannot advance further".into(),
        ));
    }

    let registration = if registration.qualified {
        registration
    } else {
        let mut active: competition_registration::ActiveModel = registration.into();
        active.qualified = Set(true);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?
    };
    txn.commit().await?;

    Ok(Json(registration_response(&state.db, registration).await?))
}

/// Postgres sums `bigint` into `numeric`; cast back so it decodes as `i64`.
const SUM_AMOUNT_DUE: &str = "CAST(COALESCE(SUM(\"amount_due\"), 0) AS BIGINT)";

#[derive(Debug, FromQueryResult)]
struct StatusTotal {
    owner_id: i32,
    status: VerificationStatus,
    count: i64,
    amount: i64,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/finance",
    tag = "Admin",
    operation_id = "adminFinanceSummary",
    summary = "Finance summary",
    description = "Requires `finance:view`. Per competition and per event: counts by status, approved revenue and pending amount, plus overall totals.",
    responses(
        (status = 200, description = "Summary", body = FinanceSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn finance_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FinanceSummary>, AppError> {
    auth_user.require_permission("finance:view")?;

    let competitions = competition::Entity::find()
        .order_by_asc(competition::Column::Code)
        .all(&state.db)
        .await?;
    let registration_totals = competition_registration::Entity::find()
        .select_only()
        .column_as(competition_registration::Column::CompetitionId, "owner_id")
        .column(competition_registration::Column::Status)
        .column_as(competition_registration::Column::Id.count(), "count")
        .column_as(Expr::cust(SUM_AMOUNT_DUE), "amount")
        .group_by(competition_registration::Column::CompetitionId)
        .group_by(competition_registration::Column::Status)
        .into_model::<StatusTotal>()
        .all(&state.db)
        .await?;

    let events = event::Entity::find()
        .order_by_asc(event::Column::StartsAt)
        .all(&state.db)
        .await?;
    let ticket_totals = event_registration::Entity::find()
        .select_only()
        .column_as(event_registration::Column::EventId, "owner_id")
        .column(event_registration::Column::Status)
        .column_as(event_registration::Column::Id.count(), "count")
        .column_as(Expr::cust(SUM_AMOUNT_DUE), "amount")
        .group_by(event_registration::Column::EventId)
        .group_by(event_registration::Column::Status)
        .into_model::<StatusTotal>()
        .all(&state.db)
        .await?;

    let competition_lines = finance_lines(
        competitions.into_iter().map(|c| (c.id, c.code)),
        registration_totals,
    );
    let event_lines = finance_lines(events.into_iter().map(|e| (e.id, e.slug)), ticket_totals);

    Ok(Json(FinanceSummary::new(competition_lines, event_lines)))
}

fn finance_lines(
    owners: impl Iterator<Item = (i32, String)>,
    totals: Vec<StatusTotal>,
) -> Vec<FinanceLine> {
    let mut by_owner: HashMap<i32, Vec<StatusTotal>> = HashMap::new();
    for total in totals {
        by_owner.entry(total.owner_id).or_default().push(total);
    }
    owners
        .map(|(id, label)| {
            let mut line = FinanceLine {
                id,
                label,
                ..Default::default()
            };
            for total in by_owner.remove(&id).unwrap_or_default() {
                line.record(total.status, total.count, total.amount);
            }
            line
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/tickets",
    tag = "Admin",
    operation_id = "adminListTickets",
    summary = "List tickets for review",
    description = "Requires `ticket:verify`. Newest first, filterable by status and event slug.",
    params(AdminTicketQuery),
    responses(
        (status = 200, description = "Tickets", body = TicketListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_tickets(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AdminTicketQuery>,
) -> Result<Json<TicketListResponse>, AppError> {
    auth_user.require_permission("ticket:verify")?;

    let (page, per_page) = page_params(query.page, query.per_page);

    let mut select = event_registration::Entity::find().inner_join(event::Entity);
    if let Some(status) = query.status {
        select = select.filter(event_registration::Column::Status.eq(status));
    }
    if let Some(ref slug) = query.event {
        select = select.filter(event::Column::Slug.eq(slug.trim()));
    }

    let total = select.clone().count(&state.db).await?;
    let tickets = select
        .order_by_desc(event_registration::Column::CreatedAt)
        .order_by_desc(event_registration::Column::Id)
        .offset(Some(page_offset(page, per_page)))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(TicketListResponse {
        data: ticket_responses(&state.db, tickets).await?,
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/tickets/{id}/approve",
    tag = "Admin",
    operation_id = "adminApproveTicket",
    summary = "Approve a ticket",
    description = "Requires `ticket:verify`. Issues a unique ticket code and records the payment in the transaction ledger.",
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Approved", body = TicketResponse),
        (status = 400, description = "No payment proof (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already decided (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, admin_id = auth_user.user_id))]
pub async fn approve_ticket(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TicketResponse>, AppError> {
    auth_user.require_permission("ticket:verify")?;

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let ticket = find_ticket_for_update(&txn, id).await?;
    ensure_decidable(ticket.status, VerificationStatus::Approved, "Ticket")?;
    if ticket.payment_proof_key.is_none() && ticket.amount_due > 0 {
        return Err(AppError::Validation(
            "Cannot approve a ticket without a payment proof".into(),
        ));
    }

    let code = issue_ticket_code(&txn).await?;
    let amount = ticket.amount_due;
    let mut active: event_registration::ActiveModel = ticket.into();
    active.status = Set(VerificationStatus::Approved);
    active.ticket_code = Set(Some(code.clone()));
    active.verified_by = Set(Some(auth_user.user_id));
    active.verified_at = Set(Some(now));
    let ticket = active.update(&txn).await?;

    record_transaction(&txn, TransactionKind::Event, id, amount, auth_user.user_id).await?;
    txn.commit().await?;

    let event = find_event(&state.db, ticket.event_id).await?;
    info!(ticket_id = id, "Ticket approved");
    notify::spawn_send(
        state.mailer.clone(),
        notify::ticket_issued(&ticket.attendee_email, &event.title, &code),
    );

    Ok(Json(TicketResponse::new(ticket, &event)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/tickets/{id}/reject",
    tag = "Admin",
    operation_id = "adminRejectTicket",
    summary = "Reject a ticket",
    description = "Requires `ticket:verify`. Only pending tickets can be rejected; the seat is released.",
    params(("id" = i32, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Rejected", body = TicketResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already decided (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, admin_id = auth_user.user_id))]
pub async fn reject_ticket(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TicketResponse>, AppError> {
    auth_user.require_permission("ticket:verify")?;

    let txn = state.db.begin().await?;
    let ticket = find_ticket_for_update(&txn, id).await?;
    ensure_decidable(ticket.status, VerificationStatus::Rejected, "Ticket")?;

    let mut active: event_registration::ActiveModel = ticket.into();
    active.status = Set(VerificationStatus::Rejected);
    active.verified_by = Set(Some(auth_user.user_id));
    active.verified_at = Set(Some(Utc::now()));
    let ticket = active.update(&txn).await?;
    txn.commit().await?;

    let event = find_event(&state.db, ticket.event_id).await?;
    info!(ticket_id = id, "Ticket rejected");
    notify::spawn_send(
        state.mailer.clone(),
        notify::ticket_rejected(&ticket.attendee_email, &event.title),
    );

    Ok(Json(TicketResponse::new(ticket, &event)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/checkin",
    tag = "Admin",
    operation_id = "adminCheckin",
    summary = "Check in a ticket",
    description = "Requires `ticket:checkin`. Accepts the code encoded in the ticket's QR image. A ticket can be checked in once.",
    request_body = CheckinRequest,
    responses(
        (status = 200, description = "Checked in", body = CheckinResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Unknown ticket code (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already checked in or not approved (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(admin_id = auth_user.user_id))]
pub async fn checkin(
    auth_user: AuthUser,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CheckinRequest>,
) -> Result<Json<CheckinResponse>, AppError> {
    auth_user.require_permission("ticket:checkin")?;

    let code = payload.code.trim().to_uppercase();
    let now = Utc::now();
    let txn = state.db.begin().await?;

    let ticket = event_registration::Entity::find()
        .filter(event_registration::Column::TicketCode.eq(&code))
        .lock(sea_orm::sea_query::LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown ticket code".into()))?;

    if ticket.status != VerificationStatus::Approved {
        return Err(AppError::Conflict("Ticket is not approved".into()));
    }
    if let Some(at) = ticket.checked_in_at {
        return Err(AppError::Conflict(format!(
            "Ticket was already checked in at {}",
            at.to_rfc3339()
        )));
    }

    let mut active: event_registration::ActiveModel = ticket.into();
    active.checked_in_at = Set(Some(now));
    let ticket = active.update(&txn).await?;
    txn.commit().await?;

    let event = find_event(&state.db, ticket.event_id).await?;
    info!(ticket_id = ticket.id, event = %event.slug, "Ticket checked in");

    Ok(Json(CheckinResponse {
        ticket_id: ticket.id,
        event_id: event.id,
        event_title: event.title,
        attendee_name: ticket.attendee_name,
        checked_in_at: now,
    }))
}

fn ensure_decidable(
    current: VerificationStatus,
    target: VerificationStatus,
    what: &str,
) -> Result<(), AppError> {
    if !current.can_transition_to(target) {
        return Err(AppError::Conflict(format!("{what} is already {current}")));
    }
    Ok(())
}

async fn record_transaction(
    txn: &DatabaseTransaction,
    kind: TransactionKind,
    registration_id: i32,
    amount: i64,
    recorded_by: i32,
) -> Result<(), AppError> {
    transaction_detail::ActiveModel {
        kind: Set(kind),
        registration_id: Set(registration_id),
        amount: Set(amount),
        recorded_by: Set(recorded_by),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn find_event<C: ConnectionTrait>(db: &C, id: i32) -> Result<event::Model, AppError> {
    event::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}
