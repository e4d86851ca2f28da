// Route modules
pub mod approvals;
pub mod ledgers;
pub mod payments;
pub mod policies;
pub mod purchases;

use crate::{app_state::AppState, middleware::logging_middleware};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Purchase intents and gateway callbacks
        .route("/purchases/request", post(purchases::request_purchase))
        .route("/payments/confirmed", post(payments::payment_confirmed))
        .route("/payments/failed", post(payments::payment_failed))
        // Hour ledger (booking subsystem surface)
        .route("/ledgers/{student_id}", get(ledgers::get_ledger_summary))
        .route(
            "/ledgers/{student_id}/availability",
            get(ledgers::check_availability),
        )
        .route("/ledgers/{student_id}/consume", post(ledgers::consume_hours))
        .route(
            "/consumptions/{consumption_id}/refund",
            post(ledgers::refund_consumption),
        )
        // Parent budget controls
        .route(
            "/policies/{student_id}",
            get(policies::get_policy).put(policies::upsert_policy),
        )
        .route(
            "/policies/{student_id}/deactivate",
            post(policies::deactivate_policy),
        )
        // Approval workflow
        .route("/approvals/pending", get(approvals::pending_approvals))
        .route(
            "/approvals/{request_id}/resolve",
            post(approvals::resolve_approval),
        )
        .route(
            "/approvals/{request_id}/cancel",
            post(approvals::cancel_approval),
        )
        .layer(middleware::from_fn(logging_middleware))
}
