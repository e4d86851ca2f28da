use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::approvals::{PurchaseOutcome, PurchaseRequest, PurchaseResponse},
};

/// POST /api/v1/purchases/request
///
/// Every purchase intent enters here. Auto-approved intents come back
/// with a transaction already handed to the gateway; the rest come back
/// as a pending approval request for the parent.
#[instrument(skip(state, request))]
pub async fn request_purchase(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let requested = state.approval_service.request_purchase(&request).await?;
    state.events.publish_all(requested.events);

    let outcome = match requested.outcome {
        PurchaseOutcome::AutoApproved { transaction } => {
            let transaction = state
                .payment_service
                .initiate_payment(transaction.id)
                .await?;
            PurchaseOutcome::AutoApproved { transaction }
        }
        pending => pending,
    };

    Ok(Json(PurchaseResponse {
        outcome,
        decision: requested.decision,
    }))
}
