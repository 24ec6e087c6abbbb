pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::session::handlers as sessions;
use crate::simulation::handlers as simulations;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sessions
        .route("/api/v1/sessions", post(sessions::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(sessions::handle_get_session).delete(sessions::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/reset",
            post(sessions::handle_reset_session),
        )
        // Simulations
        .route(
            "/api/v1/sessions/:id/simulations",
            post(simulations::handle_simulate),
        )
        .route(
            "/api/v1/sessions/:id/simulations/upload",
            post(simulations::handle_simulate_upload),
        )
        .route(
            "/api/v1/sessions/:id/runs/:run_id/export",
            get(simulations::handle_export),
        )
        .route(
            "/api/v1/sessions/:id/runs/:run_id/publish",
            post(simulations::handle_publish),
        )
        .with_state(state)
}
