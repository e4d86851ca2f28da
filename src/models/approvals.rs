use entity::sea_orm_active_enums::ApprovalRequestType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::budget::BudgetDecision;
use super::common::ApprovalDecision;

/// POST /purchases/request — a student's (or the app's) purchase intent.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub student_id: Uuid,
    pub amount: Decimal,
    pub request_type: ApprovalRequestType,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,
    pub pricing_plan_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

/// Disposition of a purchase intent: either a transaction was created
/// directly, or the intent is parked awaiting parent sign-off.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    #[serde(rename_all = "camelCase")]
    AutoApproved {
        transaction: entity::transactions::Model,
    },
    #[serde(rename_all = "camelCase")]
    PendingApproval {
        request: entity::approval_requests::Model,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    #[serde(flatten)]
    pub outcome: PurchaseOutcome,
    pub decision: BudgetDecision,
}

/// POST /approvals/{id}/resolve
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub parent_id: Uuid,
    pub decision: ApprovalDecision,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub request: entity::approval_requests::Model,
    /// Present only when the decision was approve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<entity::transactions::Model>,
}

/// POST /approvals/{id}/cancel — only the requesting student, only while
/// still pending.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub student_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovalsQuery {
    pub parent_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovalsResponse {
    pub requests: Vec<entity::approval_requests::Model>,
}
