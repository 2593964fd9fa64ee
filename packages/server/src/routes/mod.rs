mod v1;

use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new().nest("/v1", v1::routes(state)).route(
        "/cron/phase-transition",
        get(handlers::cron::phase_transition).post(handlers::cron::phase_transition),
    )
}
