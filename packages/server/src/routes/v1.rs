use axum::{
    Router, middleware,
    routing::{get, post},
};
use common::SubmissionKind;

use crate::guards::rate_limit::rate_limit;
use crate::handlers;
use crate::state::AppState;
use crate::upload::upload_body_limit;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state))
        .nest("/competitions", competition_routes(state))
        .nest("/registrations", registration_routes(state))
        .nest("/events", event_routes(state))
        .nest("/tickets", ticket_routes())
        .nest("/referral-codes", referral_routes())
        .nest("/karya", karya_routes())
        .nest("/admin", admin_routes())
        .nest("/webhooks", webhook_routes())
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/activate", post(handlers::auth::activate))
        .route("/login", post(handlers::auth::login))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .route("/me", get(handlers::auth::me))
}

fn competition_routes(state: &AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/{code}/register", post(handlers::registration::register_team))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    // GET addresses a competition by code, PATCH by numeric id.
    Router::new()
        .route(
            "/",
            get(handlers::competition::list_competitions)
                .post(handlers::competition::create_competition),
        )
        .route(
            "/{code}",
            get(handlers::competition::get_competition)
                .patch(handlers::competition::update_competition),
        )
        .merge(register)
}

fn registration_routes(state: &AppState) -> Router<AppState> {
    let max_upload_size = state.config.storage.max_upload_size;

    let payment = Router::new()
        .route(
            "/{id}/payment",
            get(handlers::registration::download_payment)
                .post(handlers::registration::upload_payment),
        )
        .layer(upload_body_limit(SubmissionKind::PaymentProof.max_size()));

    let submissions = Router::new()
        .route(
            "/{id}/submissions",
            get(handlers::registration::list_submissions)
                .post(handlers::registration::submit_file),
        )
        .layer(upload_body_limit(max_upload_size));

    Router::new()
        .route("/", get(handlers::registration::list_my_registrations))
        .route("/{id}", get(handlers::registration::get_registration))
        .merge(payment)
        .merge(submissions)
}

fn event_routes(state: &AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/{slug}/register", post(handlers::event::register_ticket))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route(
            "/",
            get(handlers::event::list_events).post(handlers::event::create_event),
        )
        .route("/{slug}", get(handlers::event::get_event))
        .merge(register)
}

fn ticket_routes() -> Router<AppState> {
    let payment = Router::new()
        .route(
            "/{id}/payment",
            get(handlers::event::download_ticket_payment)
                .post(handlers::event::upload_ticket_payment),
        )
        .layer(upload_body_limit(SubmissionKind::PaymentProof.max_size()));

    Router::new()
        .route("/", get(handlers::event::list_my_tickets))
        .merge(payment)
}

fn referral_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::referral::create_referral_code))
        .route("/{code}", get(handlers::referral::get_referral_code))
}

fn karya_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::karya::list_karya).post(handlers::karya::create_karya),
        )
        .route("/{id}/vote", post(handlers::karya::vote))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/registrations", get(handlers::admin::list_registrations))
        .route(
            "/registrations/{id}",
            get(handlers::admin::get_registration_detail),
        )
        .route(
            "/registrations/{id}/approve",
            post(handlers::admin::approve_registration),
        )
        .route(
            "/registrations/{id}/reject",
            post(handlers::admin::reject_registration),
        )
        .route(
            "/registrations/{id}/qualify",
            post(handlers::admin::qualify_registration),
        )
        .route("/finance", get(handlers::admin::finance_summary))
        .route("/tickets", get(handlers::admin::list_tickets))
        .route("/tickets/{id}/approve", post(handlers::admin::approve_ticket))
        .route("/tickets/{id}/reject", post(handlers::admin::reject_ticket))
        .route("/checkin", post(handlers::admin::checkin))
}

fn webhook_routes() -> Router<AppState> {
    Router::new().route(
        "/import-registration",
        post(handlers::webhook::import_registration),
    )
}
