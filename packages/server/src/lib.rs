pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod routes;
pub mod seed;
pub mod state;
pub mod upload;
pub mod utils;

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::routing::get;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "The Sandbox API",
        version = "1.0.0",
        description = "Competition registration, events and voting for The Sandbox by IEEE ITB"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::activate,
        handlers::auth::login,
        handlers::auth::me,
        handlers::competition::list_competitions,
        handlers::competition::get_competition,
        handlers::competition::create_competition,
        handlers::competition::update_competition,
        handlers::registration::register_team,
        handlers::registration::list_my_registrations,
        handlers::registration::get_registration,
        handlers::registration::upload_payment,
        handlers::registration::download_payment,
        handlers::registration::submit_file,
        handlers::registration::list_submissions,
        handlers::event::list_events,
        handlers::event::get_event,
        handlers::event::create_event,
        handlers::event::register_ticket,
        handlers::event::list_my_tickets,
        handlers::event::upload_ticket_payment,
        handlers::event::download_ticket_payment,
        handlers::referral::get_referral_code,
        handlers::referral::create_referral_code,
        handlers::karya::list_karya,
        handlers::karya::create_karya,
        handlers::karya::vote,
        handlers::admin::list_registrations,
        handlers::admin::get_registration_detail,
        handlers::admin::approve_registration,
        handlers::admin::reject_registration,
        handlers::admin::qualify_registration,
        handlers::admin::finance_summary,
        handlers::admin::list_tickets,
        handlers::admin::approve_ticket,
        handlers::admin::reject_ticket,
        handlers::admin::checkin,
        handlers::webhook::import_registration,
        handlers::cron::phase_transition,
        handlers::health::health,
    ),
    components(schemas(error::ErrorBody)),
    tags(
        (name = "Auth", description = "Accounts, activation and login"),
        (name = "Competitions", description = "Competition catalogue and schedules"),
        (name = "Registrations", description = "Team registrations, payment proofs and phase submissions"),
        (name = "Events", description = "Events and ticket registration"),
        (name = "Referral Codes", description = "Registration discount codes"),
        (name = "Karya", description = "Showcased works and public voting"),
        (name = "Admin", description = "Verification, finance and check-in"),
        (name = "Webhooks", description = "Inbound integrations"),
        (name = "Cron", description = "Scheduled jobs"),
        (name = "Health", description = "Liveness and database reachability"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let api = ApiDoc::openapi();

    axum::Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", routes::api_routes(&state))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("idempotency-key"),
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(config.max_age))
}
