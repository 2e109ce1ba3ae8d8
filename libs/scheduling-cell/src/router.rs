// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::SchedulingState;

pub fn scheduling_routes(state: Arc<SchedulingState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Availability
        .route("/availability/check", post(handlers::check_availability))
        .route("/availability/bulk-check", post(handlers::bulk_check_availability))
        // Optimization and auto-resolve
        .route("/slots/optimize", post(handlers::optimize_slots))
        .route("/conflicts/resolve", post(handlers::resolve_conflict))
        // Session timing
        .route("/sessions/{session_id}/adjust-duration", post(handlers::adjust_session_duration))
        // Therapist assignment
        .route("/assignments/score", post(handlers::score_assignment))
        .with_state(state)
}
