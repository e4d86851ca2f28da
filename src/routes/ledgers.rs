use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::ledger::{
        AvailabilityQuery, AvailabilityResponse, ConsumeRequest, ConsumeResponse,
        LedgerSummaryResponse, RefundRequest, RefundResponse,
    },
};

/// GET /api/v1/ledgers/{student_id}
#[instrument(skip(state))]
pub async fn get_ledger_summary(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<LedgerSummaryResponse>> {
    let summary = state.ledger_service.summary(student_id).await?;
    Ok(Json(summary))
}

/// GET /api/v1/ledgers/{student_id}/availability?hours=
///
/// The booking subsystem calls this before confirming a session.
#[instrument(skip(state))]
pub async fn check_availability(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>> {
    let availability = state
        .ledger_service
        .check_availability(student_id, query.hours)
        .await?;

    Ok(Json(availability))
}

/// POST /api/v1/ledgers/{student_id}/consume
///
/// Called by the booking subsystem when a session completes.
#[instrument(skip(state, request))]
pub async fn consume_hours(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<ConsumeRequest>,
) -> Result<Json<ConsumeResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let (record, remaining_hours) = state
        .ledger_service
        .consume(
            student_id,
            request.hours,
            request.transaction_id,
            request.hours_reserved,
            request.session_id,
        )
        .await?;

    Ok(Json(ConsumeResponse {
        consumption: record.into(),
        remaining_hours,
    }))
}

/// POST /api/v1/consumptions/{consumption_id}/refund
#[instrument(skip(state, request))]
pub async fn refund_consumption(
    State(state): State<AppState>,
    Path(consumption_id): Path<Uuid>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<RefundResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let (record, remaining_hours) = state
        .ledger_service
        .reverse_consumption(consumption_id, &request.reason)
        .await?;

    Ok(Json(RefundResponse {
        consumption: record.into(),
        remaining_hours,
    }))
}
