use crate::{
    config::SchoolConfig,
    error::{ApiError, Result},
    models::budget::{BudgetDecision, DecisionReason, PolicyResponse, PolicyUpsertRequest},
};
use rust_decimal::Decimal;
use sea_orm::{entity::*, query::*, DatabaseConnection};
use time::{OffsetDateTime, UtcOffset};
use tracing::{instrument, warn};
use uuid::Uuid;

use entity::sea_orm_active_enums::{ApprovalRequestType, TransactionStatus};

/// Weeks per month, used only for the advisory limit-consistency check.
const WEEKS_PER_MONTH: Decimal = Decimal::from_parts(433, 0, 0, false, 2);

pub struct BudgetService {
    db: DatabaseConnection,
    offset: UtcOffset,
}

impl BudgetService {
    pub fn new(db: DatabaseConnection, config: &SchoolConfig) -> Self {
        let offset = UtcOffset::from_whole_seconds(config.timezone_offset_minutes * 60)
            .unwrap_or_else(|_| {
                warn!(
                    "Invalid school timezone offset {} minutes, falling back to UTC",
                    config.timezone_offset_minutes
                );
                UtcOffset::UTC
            });
        Self { db, offset }
    }

    /// Evaluate a proposed purchase against the policy in effect.
    /// Read-only: spend is always recomputed from completed transactions,
    /// never cached, so there is no counter to drift.
    #[instrument(skip(self, policy))]
    pub async fn evaluate(
        &self,
        student_id: Uuid,
        policy: Option<&entity::budget_policies::Model>,
        amount: Decimal,
        request_type: ApprovalRequestType,
    ) -> Result<BudgetDecision> {
        let now = OffsetDateTime::now_utc();
        let (month_start, month_end) =
            month_window(now, self.offset).map_err(|e| anyhow::anyhow!(e))?;
        let (week_start, week_end) = week_window(now, self.offset);

        let month_spent = self
            .completed_spend_between(student_id, month_start, month_end)
            .await?;
        let week_spent = self
            .completed_spend_between(student_id, week_start, week_end)
            .await?;

        Ok(match policy {
            Some(policy) => decide(policy, amount, request_type, month_spent, week_spent),
            None => no_policy_decision(month_spent, week_spent),
        })
    }

    async fn completed_spend_between(
        &self,
        student_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Decimal> {
        let total = entity::transactions::Entity::find()
            .filter(entity::transactions::Column::StudentId.eq(student_id))
            .filter(entity::transactions::Column::Status.eq(TransactionStatus::Completed))
            .filter(entity::transactions::Column::CreatedAt.gte(start))
            .filter(entity::transactions::Column::CreatedAt.lt(end))
            .select_only()
            .column_as(entity::transactions::Column::Amount.sum(), "total_amount")
            .into_tuple::<Option<Decimal>>()
            .one(&self.db)
            .await?
            .flatten()
            .unwrap_or(Decimal::ZERO);

        Ok(total)
    }

    /// Fetch the policy for a parent-child relationship, active or not.
    #[instrument(skip(self))]
    pub async fn get_policy(
        &self,
        student_id: Uuid,
    ) -> Result<Option<entity::budget_policies::Model>> {
        let Some(link) = self.find_guardian_link(student_id, None).await? else {
            return Ok(None);
        };

        let policy = entity::budget_policies::Entity::find()
            .filter(entity::budget_policies::Column::GuardianLinkId.eq(link.id))
            .one(&self.db)
            .await?;

        Ok(policy)
    }

    /// Create or update the parent's guardrails for one child. Creation
    /// defaults are the most protective: no limits, zero auto-approval,
    /// sign-off required for both categories.
    #[instrument(skip(self, request))]
    pub async fn upsert_policy(
        &self,
        student_id: Uuid,
        request: &PolicyUpsertRequest,
    ) -> Result<PolicyResponse> {
        let link = self
            .find_guardian_link(student_id, Some(request.parent_id))
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No active guardian link between parent {} and student {}",
                    request.parent_id, student_id
                ))
            })?;

        validate_limits(request)?;

        let now = OffsetDateTime::now_utc();
        let existing = entity::budget_policies::Entity::find()
            .filter(entity::budget_policies::Column::GuardianLinkId.eq(link.id))
            .one(&self.db)
            .await?;

        let policy = match existing {
            Some(policy) => {
                let mut active: entity::budget_policies::ActiveModel = policy.into();
                active.monthly_limit = Set(request.monthly_limit);
                active.weekly_limit = Set(request.weekly_limit);
                if let Some(threshold) = request.auto_approval_threshold {
                    active.auto_approval_threshold = Set(threshold);
                }
                if let Some(flag) = request.require_approval_for_sessions {
                    active.require_approval_for_sessions = Set(flag);
                }
                if let Some(flag) = request.require_approval_for_packages {
                    active.require_approval_for_packages = Set(flag);
                }
                active.is_active = Set(true);
                active.updated_at = Set(now);
                active.update(&self.db).await?
            }
            None => {
                let new_policy = entity::budget_policies::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    guardian_link_id: Set(link.id),
                    monthly_limit: Set(request.monthly_limit),
                    weekly_limit: Set(request.weekly_limit),
                    auto_approval_threshold: Set(request
                        .auto_approval_threshold
                        .unwrap_or(Decimal::ZERO)),
                    require_approval_for_sessions: Set(request
                        .require_approval_for_sessions
                        .unwrap_or(true)),
                    require_approval_for_packages: Set(request
                        .require_approval_for_packages
                        .unwrap_or(true)),
                    is_active: Set(true),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                new_policy.insert(&self.db).await?
            }
        };

        let consistency_warning = limit_consistency_warning(&policy);
        if let Some(ref warning) = consistency_warning {
            warn!(policy_id = %policy.id, "{}", warning);
        }

        Ok(PolicyResponse {
            policy,
            consistency_warning,
        })
    }

    /// Deactivate, never delete: history stays auditable and the policy
    /// can be switched back on later.
    #[instrument(skip(self))]
    pub async fn deactivate_policy(
        &self,
        student_id: Uuid,
        parent_id: Uuid,
    ) -> Result<entity::budget_policies::Model> {
        let link = self
            .find_guardian_link(student_id, Some(parent_id))
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No active guardian link between parent {} and student {}",
                    parent_id, student_id
                ))
            })?;

        let policy = entity::budget_policies::Entity::find()
            .filter(entity::budget_policies::Column::GuardianLinkId.eq(link.id))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("No budget policy for student {}", student_id))
            })?;

        let mut active: entity::budget_policies::ActiveModel = policy.into();
        active.is_active = Set(false);
        active.updated_at = Set(OffsetDateTime::now_utc());
        let policy = active.update(&self.db).await?;

        Ok(policy)
    }

    async fn find_guardian_link(
        &self,
        student_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<Option<entity::guardian_links::Model>> {
        let mut query = entity::guardian_links::Entity::find()
            .filter(entity::guardian_links::Column::StudentId.eq(student_id))
            .filter(entity::guardian_links::Column::IsActive.eq(true));
        if let Some(parent_id) = parent_id {
            query = query.filter(entity::guardian_links::Column::ParentId.eq(parent_id));
        }

        let link = query
            .order_by_asc(entity::guardian_links::Column::CreatedAt)
            .one(&self.db)
            .await?;

        Ok(link)
    }
}

fn validate_limits(request: &PolicyUpsertRequest) -> Result<()> {
    for (name, limit) in [
        ("monthlyLimit", request.monthly_limit),
        ("weeklyLimit", request.weekly_limit),
        ("autoApprovalThreshold", request.auto_approval_threshold),
    ] {
        if let Some(value) = limit {
            if value < Decimal::ZERO {
                return Err(ApiError::BadRequest(format!(
                    "{} must not be negative",
                    name
                )));
            }
        }
    }
    Ok(())
}

/// Advisory check only: a weekly limit that implies more than the
/// monthly limit is probably a configuration mistake, but the parent may
/// have meant it. Never blocks.
pub fn limit_consistency_warning(policy: &entity::budget_policies::Model) -> Option<String> {
    match (policy.weekly_limit, policy.monthly_limit) {
        (Some(weekly), Some(monthly)) if weekly * WEEKS_PER_MONTH > monthly => Some(format!(
            "Weekly limit {} implies roughly {} per month, above the monthly limit {}",
            weekly,
            weekly * WEEKS_PER_MONTH,
            monthly
        )),
        _ => None,
    }
}

fn no_policy_decision(month_spent: Decimal, week_spent: Decimal) -> BudgetDecision {
    BudgetDecision {
        allowed: true,
        requires_approval: false,
        reason: DecisionReason::NoPolicy,
        current_month_spent: month_spent,
        current_week_spent: week_spent,
        remaining_monthly: None,
        remaining_weekly: None,
    }
}

/// The four-step decision algorithm. Limits are soft gates: an over-limit
/// purchase is held for sign-off so the parent sees it, not rejected.
pub fn decide(
    policy: &entity::budget_policies::Model,
    amount: Decimal,
    request_type: ApprovalRequestType,
    month_spent: Decimal,
    week_spent: Decimal,
) -> BudgetDecision {
    if !policy.is_active {
        return no_policy_decision(month_spent, week_spent);
    }

    let remaining_monthly = policy
        .monthly_limit
        .map(|limit| (limit - month_spent).max(Decimal::ZERO));
    let remaining_weekly = policy
        .weekly_limit
        .map(|limit| (limit - week_spent).max(Decimal::ZERO));

    let over_monthly = policy
        .monthly_limit
        .is_some_and(|limit| month_spent + amount > limit);
    let over_weekly = policy
        .weekly_limit
        .is_some_and(|limit| week_spent + amount > limit);

    if amount > Decimal::ZERO && (over_monthly || over_weekly) {
        return BudgetDecision {
            allowed: false,
            requires_approval: true,
            reason: DecisionReason::BudgetExceeded,
            current_month_spent: month_spent,
            current_week_spent: week_spent,
            remaining_monthly,
            remaining_weekly,
        };
    }

    let category_needs_signoff = match request_type {
        ApprovalRequestType::Session => policy.require_approval_for_sessions,
        ApprovalRequestType::Hours | ApprovalRequestType::Subscription => {
            policy.require_approval_for_packages
        }
    };

    if amount <= policy.auto_approval_threshold && !category_needs_signoff {
        return BudgetDecision {
            allowed: true,
            requires_approval: false,
            reason: DecisionReason::AutoApproved,
            current_month_spent: month_spent,
            current_week_spent: week_spent,
            remaining_monthly,
            remaining_weekly,
        };
    }

    BudgetDecision {
        allowed: true,
        requires_approval: true,
        reason: DecisionReason::ApprovalRequired,
        current_month_spent: month_spent,
        current_week_spent: week_spent,
        remaining_monthly,
        remaining_weekly,
    }
}

/// Calendar-month window in the school's local offset, returned in
/// absolute time for querying.
fn month_window(
    now: OffsetDateTime,
    offset: UtcOffset,
) -> std::result::Result<(OffsetDateTime, OffsetDateTime), time::error::ComponentRange> {
    let local = now.to_offset(offset);
    let start_date = time::Date::from_calendar_date(local.year(), local.month(), 1)?;
    let (next_year, next_month) = match local.month() {
        time::Month::December => (local.year() + 1, time::Month::January),
        month => (local.year(), month.next()),
    };
    let end_date = time::Date::from_calendar_date(next_year, next_month, 1)?;

    Ok((
        start_date.midnight().assume_offset(offset),
        end_date.midnight().assume_offset(offset),
    ))
}

/// Monday 00:00 through Sunday 24:00 in the school's local offset.
fn week_window(now: OffsetDateTime, offset: UtcOffset) -> (OffsetDateTime, OffsetDateTime) {
    let local = now.to_offset(offset);
    let days_from_monday = i64::from(local.date().weekday().number_days_from_monday());
    let start_date = local.date() - time::Duration::days(days_from_monday);
    let start = start_date.midnight().assume_offset(offset);

    (start, start + time::Duration::days(7))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn policy(
        monthly: Option<i64>,
        weekly: Option<i64>,
        threshold: i64,
        sessions_flag: bool,
        packages_flag: bool,
    ) -> entity::budget_policies::Model {
        let now = OffsetDateTime::now_utc();
        entity::budget_policies::Model {
            id: Uuid::new_v4(),
            guardian_link_id: Uuid::new_v4(),
            monthly_limit: monthly.map(Decimal::from),
            weekly_limit: weekly.map(Decimal::from),
            auto_approval_threshold: Decimal::from(threshold),
            require_approval_for_sessions: sessions_flag,
            require_approval_for_packages: packages_flag,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_inactive_policy_auto_approves() {
        let mut p = policy(Some(100), None, 0, true, true);
        p.is_active = false;

        let d = decide(
            &p,
            Decimal::from(500),
            ApprovalRequestType::Hours,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert!(d.allowed);
        assert!(!d.requires_approval);
        assert_eq!(d.reason, DecisionReason::NoPolicy);
    }

    #[test]
    fn test_small_session_purchase_auto_approved_within_limit() {
        // monthly_limit=100, threshold=20, sessions flag off,
        // spent=50, amount=15 -> auto-approved
        let p = policy(Some(100), None, 20, false, true);

        let d = decide(
            &p,
            Decimal::from(15),
            ApprovalRequestType::Session,
            Decimal::from(50),
            Decimal::from(10),
        );
        assert!(d.allowed);
        assert!(!d.requires_approval);
        assert_eq!(d.reason, DecisionReason::AutoApproved);
        assert_eq!(d.remaining_monthly, Some(Decimal::from(50)));
    }

    #[test]
    fn test_over_monthly_limit_routes_to_approval() {
        // spent=50, amount=60, limit=100 -> held for sign-off, not rejected
        let p = policy(Some(100), None, 20, false, true);

        let d = decide(
            &p,
            Decimal::from(60),
            ApprovalRequestType::Session,
            Decimal::from(50),
            Decimal::ZERO,
        );
        assert!(!d.allowed);
        assert!(d.requires_approval);
        assert_eq!(d.reason, DecisionReason::BudgetExceeded);
    }

    #[test]
    fn test_weekly_limit_checked_independently() {
        let p = policy(Some(1000), Some(50), 100, false, false);

        let d = decide(
            &p,
            Decimal::from(30),
            ApprovalRequestType::Hours,
            Decimal::from(100),
            Decimal::from(40),
        );
        assert_eq!(d.reason, DecisionReason::BudgetExceeded);
        assert_eq!(d.remaining_weekly, Some(Decimal::from(10)));
    }

    #[test]
    fn test_category_flag_forces_signoff_despite_threshold() {
        let p = policy(Some(100), None, 20, true, true);

        let d = decide(
            &p,
            Decimal::from(15),
            ApprovalRequestType::Session,
            Decimal::from(50),
            Decimal::ZERO,
        );
        assert!(d.allowed);
        assert!(d.requires_approval);
        assert_eq!(d.reason, DecisionReason::ApprovalRequired);
    }

    #[test]
    fn test_zero_threshold_never_auto_approves() {
        let p = policy(None, None, 0, false, false);

        let d = decide(
            &p,
            Decimal::from(1),
            ApprovalRequestType::Hours,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert!(d.allowed);
        assert!(d.requires_approval);
        assert_eq!(d.reason, DecisionReason::ApprovalRequired);
    }

    #[test]
    fn test_exact_limit_not_exceeded() {
        // 50 + 50 == 100 is allowed; the gate trips strictly above.
        let p = policy(Some(100), None, 100, false, false);

        let d = decide(
            &p,
            Decimal::from(50),
            ApprovalRequestType::Hours,
            Decimal::from(50),
            Decimal::ZERO,
        );
        assert_eq!(d.reason, DecisionReason::AutoApproved);
    }

    #[test]
    fn test_week_window_monday_anchor() {
        // 2025-06-11 is a Wednesday
        let now = datetime!(2025-06-11 15:30 UTC);
        let (start, end) = week_window(now, UtcOffset::UTC);

        assert_eq!(start, datetime!(2025-06-09 00:00 UTC));
        assert_eq!(end, datetime!(2025-06-16 00:00 UTC));
    }

    #[test]
    fn test_week_window_monday_is_its_own_start() {
        let now = datetime!(2025-06-09 00:00 UTC);
        let (start, _) = week_window(now, UtcOffset::UTC);
        assert_eq!(start, datetime!(2025-06-09 00:00 UTC));
    }

    #[test]
    fn test_month_window_december_rollover() {
        let now = datetime!(2025-12-15 12:00 UTC);
        let (start, end) = month_window(now, UtcOffset::UTC).unwrap();

        assert_eq!(start, datetime!(2025-12-01 00:00 UTC));
        assert_eq!(end, datetime!(2026-01-01 00:00 UTC));
    }

    #[test]
    fn test_windows_respect_school_offset() {
        // 23:30 UTC on June 30 is already July 1 at UTC+1
        let now = datetime!(2025-06-30 23:30 UTC);
        let offset = UtcOffset::from_whole_seconds(3600).unwrap();
        let (start, _) = month_window(now, offset).unwrap();

        assert_eq!(start, datetime!(2025-07-01 00:00 +1));
    }

    #[test]
    fn test_limit_consistency_warning_advisory() {
        let p = policy(Some(100), Some(50), 0, true, true);
        // 50 * 4.33 = 216.5 > 100
        assert!(limit_consistency_warning(&p).is_some());

        let p = policy(Some(500), Some(50), 0, true, true);
        // 216.5 < 500
        assert!(limit_consistency_warning(&p).is_none());

        let p = policy(None, Some(50), 0, true, true);
        assert!(limit_consistency_warning(&p).is_none());
    }
}
