use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::budget::{PolicyResponse, PolicyUpsertRequest},
    services::budget_service::limit_consistency_warning,
};

/// GET /api/v1/policies/{student_id}
#[instrument(skip(state))]
pub async fn get_policy(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<PolicyResponse>> {
    let policy = state
        .budget_service
        .get_policy(student_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("No budget policy for student {}", student_id))
        })?;

    let consistency_warning = limit_consistency_warning(&policy);

    Ok(Json(PolicyResponse {
        policy,
        consistency_warning,
    }))
}

/// PUT /api/v1/policies/{student_id}
///
/// Creates the policy on first use with the most protective defaults,
/// updates it afterwards.
#[instrument(skip(state, request))]
pub async fn upsert_policy(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<PolicyUpsertRequest>,
) -> Result<Json<PolicyResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let response = state
        .budget_service
        .upsert_policy(student_id, &request)
        .await?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateRequest {
    pub parent_id: Uuid,
}

/// POST /api/v1/policies/{student_id}/deactivate
#[instrument(skip(state, request))]
pub async fn deactivate_policy(
    State(state): State<AppState>,
    Path(student_id): Path<Uuid>,
    Json(request): Json<DeactivateRequest>,
) -> Result<Json<PolicyResponse>> {
    let policy = state
        .budget_service
        .deactivate_policy(student_id, request.parent_id)
        .await?;

    Ok(Json(PolicyResponse {
        policy,
        consistency_warning: None,
    }))
}
