use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::payments::{PaymentCallbackResponse, PaymentConfirmedRequest, PaymentFailedRequest},
};

/// POST /api/v1/payments/confirmed
///
/// Gateway success callback. Safe to retry: a duplicate confirmation is
/// ignored and can never double-credit the ledger.
#[instrument(skip(state, request))]
pub async fn payment_confirmed(
    State(state): State<AppState>,
    Json(request): Json<PaymentConfirmedRequest>,
) -> Result<Json<PaymentCallbackResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let (transaction, events) = state
        .payment_service
        .on_payment_confirmed(&request.gateway_reference)
        .await?;
    state.events.publish_all(events);

    Ok(Json(PaymentCallbackResponse { transaction }))
}

/// POST /api/v1/payments/failed
#[instrument(skip(state, request))]
pub async fn payment_failed(
    State(state): State<AppState>,
    Json(request): Json<PaymentFailedRequest>,
) -> Result<Json<PaymentCallbackResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let transaction = state
        .payment_service
        .on_payment_failed(&request.gateway_reference, request.reason)
        .await?;

    Ok(Json(PaymentCallbackResponse { transaction }))
}
