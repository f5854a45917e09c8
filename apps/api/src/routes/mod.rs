pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::outreach::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/outreach/batches",
            post(handlers::handle_create_batch),
        )
        .route(
            "/api/v1/outreach/batches/:id",
            get(handlers::handle_get_batch).delete(handlers::handle_cancel_batch),
        )
        .route(
            "/api/v1/outreach/batches/:id/results",
            get(handlers::handle_get_results),
        )
        .route(
            "/api/v1/outreach/batches/:id/export",
            get(handlers::handle_export),
        )
        .with_state(state)
}
