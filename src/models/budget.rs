use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Why the budget evaluation landed where it did. Closed enum; routes
/// and notifications match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// No active policy configured; spending is unrestricted.
    NoPolicy,
    /// Purchase would push period spend over a configured limit; routed
    /// to manual approval, never silently rejected.
    BudgetExceeded,
    /// Within limits and under the auto-approval threshold.
    AutoApproved,
    /// Within limits but the policy demands explicit sign-off.
    ApprovalRequired,
}

/// Outcome of BudgetPolicy evaluation for one proposed purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDecision {
    pub allowed: bool,
    pub requires_approval: bool,
    pub reason: DecisionReason,
    pub current_month_spent: Decimal,
    pub current_week_spent: Decimal,
    /// Remaining headroom under each limit; None when unlimited.
    pub remaining_monthly: Option<Decimal>,
    pub remaining_weekly: Option<Decimal>,
}

/// Create-or-update payload for a parent's budget policy.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PolicyUpsertRequest {
    pub parent_id: uuid::Uuid,
    pub monthly_limit: Option<Decimal>,
    pub weekly_limit: Option<Decimal>,
    #[serde(default)]
    pub auto_approval_threshold: Option<Decimal>,
    pub require_approval_for_sessions: Option<bool>,
    pub require_approval_for_packages: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub policy: entity::budget_policies::Model,
    /// Advisory only: set when weekly_limit x 4.33 exceeds monthly_limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency_warning: Option<String>,
}
