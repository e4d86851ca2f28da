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
    models::approvals::{
        CancelRequest, PendingApprovalsQuery, PendingApprovalsResponse, ResolveRequest,
        ResolveResponse,
    },
};

/// GET /api/v1/approvals/pending?parentId=
#[instrument(skip(state))]
pub async fn pending_approvals(
    State(state): State<AppState>,
    Query(query): Query<PendingApprovalsQuery>,
) -> Result<Json<PendingApprovalsResponse>> {
    let requests = state
        .approval_service
        .pending_for_parent(query.parent_id)
        .await?;

    Ok(Json(PendingApprovalsResponse { requests }))
}

/// POST /api/v1/approvals/{request_id}/resolve
#[instrument(skip(state, request))]
pub async fn resolve_approval(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let resolution = state
        .approval_service
        .resolve(request_id, request.parent_id, request.decision, request.notes)
        .await?;
    state.events.publish_all(resolution.events);

    // An approval produced a pending transaction; hand it to the gateway.
    let transaction = match resolution.transaction {
        Some(transaction) => Some(
            state
                .payment_service
                .initiate_payment(transaction.id)
                .await?,
        ),
        None => None,
    };

    Ok(Json(ResolveResponse {
        request: resolution.request,
        transaction,
    }))
}

/// POST /api/v1/approvals/{request_id}/cancel
#[instrument(skip(state, request))]
pub async fn cancel_approval(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<ResolveResponse>> {
    let resolution = state
        .approval_service
        .cancel(request_id, request.student_id)
        .await?;
    state.events.publish_all(resolution.events);

    Ok(Json(ResolveResponse {
        request: resolution.request,
        transaction: None,
    }))
}
