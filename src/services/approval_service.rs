use crate::{
    config::ApprovalsConfig,
    error::{ApiError, Result},
    events::DomainEvent,
    models::{
        approvals::{PurchaseOutcome, PurchaseRequest},
        budget::{BudgetDecision, DecisionReason},
        common::ApprovalDecision,
    },
    services::{BudgetService, RelationshipDirectory},
};
use sea_orm::{
    entity::*, query::*, sea_query::Expr, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, TransactionTrait,
};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use entity::sea_orm_active_enums::{
    ApprovalRequestType, ApprovalStatus, TransactionKind, TransactionStatus,
};

pub struct ApprovalService {
    db: DatabaseConnection,
    budget_service: Arc<BudgetService>,
    relationships: Arc<RelationshipDirectory>,
    ttl: time::Duration,
}

/// What request_purchase produced, plus the events to dispatch.
pub struct RequestedPurchase {
    pub outcome: PurchaseOutcome,
    pub decision: BudgetDecision,
    pub events: Vec<DomainEvent>,
}

pub struct Resolution {
    pub request: entity::approval_requests::Model,
    pub transaction: Option<entity::transactions::Model>,
    pub events: Vec<DomainEvent>,
}

impl ApprovalService {
    pub fn new(
        db: DatabaseConnection,
        config: &ApprovalsConfig,
        budget_service: Arc<BudgetService>,
        relationships: Arc<RelationshipDirectory>,
    ) -> Self {
        Self {
            db,
            budget_service,
            relationships,
            ttl: time::Duration::hours(config.ttl_hours),
        }
    }

    /// Entry point for every purchase intent. Consults the budget policy
    /// and either creates the transaction directly or parks the intent as
    /// a pending approval request. No ledger mutation happens here in
    /// either case; that waits for gateway confirmation.
    #[instrument(skip(self, request))]
    pub async fn request_purchase(&self, request: &PurchaseRequest) -> Result<RequestedPurchase> {
        if request.amount <= rust_decimal::Decimal::ZERO {
            return Err(ApiError::BadRequest(
                "Purchase amount must be positive".to_string(),
            ));
        }

        let plan = self.load_plan(request.pricing_plan_id, &self.db).await?;
        if request.request_type == ApprovalRequestType::Hours && plan.is_none() {
            return Err(ApiError::BadRequest(
                "An hours purchase must reference a pricing plan".to_string(),
            ));
        }

        let linked_policy = self
            .relationships
            .get_active_policy(request.student_id)
            .await?;
        let decision = self
            .budget_service
            .evaluate(
                request.student_id,
                linked_policy.as_ref().map(|(_, policy)| policy),
                request.amount,
                request.request_type,
            )
            .await?;

        if !decision.requires_approval {
            let transaction = self
                .create_transaction(
                    request.student_id,
                    request.amount,
                    request.request_type,
                    plan.as_ref(),
                    &self.db,
                )
                .await?;

            info!(
                "Auto-approved purchase for student {}: transaction={}, reason={:?}",
                request.student_id, transaction.id, decision.reason
            );

            return Ok(RequestedPurchase {
                outcome: PurchaseOutcome::AutoApproved { transaction },
                decision,
                events: Vec::new(),
            });
        }

        // Held for sign-off. The relationship must exist here, otherwise
        // no policy could have demanded approval.
        let (link, policy) = linked_policy.ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "Approval required for student {} without an active policy",
                request.student_id
            ))
        })?;

        let now = OffsetDateTime::now_utc();
        let pending = entity::approval_requests::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(request.student_id),
            parent_id: Set(link.parent_id),
            budget_policy_id: Set(Some(policy.id)),
            amount: Set(request.amount),
            description: Set(request.description.clone()),
            request_type: Set(request.request_type),
            status: Set(ApprovalStatus::Pending),
            expires_at: Set(now + self.ttl),
            parent_response: Set(None),
            resolved_at: Set(None),
            pricing_plan_id: Set(request.pricing_plan_id),
            session_id: Set(request.session_id),
            transaction_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let pending = pending.insert(&self.db).await?;

        let mut events = vec![DomainEvent::ApprovalRequested {
            request_id: pending.id,
            student_id: pending.student_id,
            parent_id: pending.parent_id,
            amount: pending.amount,
            request_type: pending.request_type,
        }];
        if decision.reason == DecisionReason::BudgetExceeded {
            events.push(DomainEvent::BudgetExceededWarning {
                student_id: pending.student_id,
                parent_id: pending.parent_id,
                amount: pending.amount,
                current_month_spent: decision.current_month_spent,
                current_week_spent: decision.current_week_spent,
            });
        }

        info!(
            "Purchase held for approval: request={}, student={}, reason={:?}",
            pending.id, pending.student_id, decision.reason
        );

        Ok(RequestedPurchase {
            outcome: PurchaseOutcome::PendingApproval { request: pending },
            decision,
            events,
        })
    }

    /// Parent resolution of a pending request. Status is re-checked under
    /// an exclusive row lock, so of two concurrent resolvers exactly one
    /// performs the terminal transition and the other sees InvalidState.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        request_id: Uuid,
        parent_id: Uuid,
        decision: ApprovalDecision,
        notes: Option<String>,
    ) -> Result<Resolution> {
        let txn = self.db.begin().await?;
        let request = self.find_and_lock_request(request_id, &txn).await?;

        // Lazy expiry comes first: a request past its deadline is never
        // actionable, whoever asks.
        if let Some(err) = self.mark_expired_if_stale(&request, &txn).await? {
            txn.commit().await?;
            return Err(err);
        }
        if request.parent_id != parent_id {
            txn.rollback().await?;
            return Err(ApiError::UnauthorizedApprover(format!(
                "Parent {} is not the approver for request {}",
                parent_id, request_id
            )));
        }
        if request.status != ApprovalStatus::Pending {
            let err = already_resolved(&request);
            txn.rollback().await?;
            return Err(err);
        }

        let now = OffsetDateTime::now_utc();
        let (request, transaction) = match decision {
            ApprovalDecision::Approve => {
                let plan = self.load_plan(request.pricing_plan_id, &txn).await?;
                let transaction = self
                    .create_transaction(
                        request.student_id,
                        request.amount,
                        request.request_type,
                        plan.as_ref(),
                        &txn,
                    )
                    .await?;

                let mut active: entity::approval_requests::ActiveModel = request.into();
                active.status = Set(ApprovalStatus::Approved);
                active.parent_response = Set(notes);
                active.resolved_at = Set(Some(now));
                active.transaction_id = Set(Some(transaction.id));
                active.updated_at = Set(now);
                (active.update(&txn).await?, Some(transaction))
            }
            ApprovalDecision::Deny => {
                let mut active: entity::approval_requests::ActiveModel = request.into();
                active.status = Set(ApprovalStatus::Denied);
                active.parent_response = Set(notes);
                active.resolved_at = Set(Some(now));
                active.updated_at = Set(now);
                (active.update(&txn).await?, None)
            }
        };

        txn.commit().await?;

        info!(
            "Approval request {} resolved as {:?} by parent {}",
            request.id, request.status, parent_id
        );

        let events = vec![DomainEvent::ApprovalResolved {
            request_id: request.id,
            student_id: request.student_id,
            parent_id: request.parent_id,
            status: request.status,
            transaction_id: request.transaction_id,
        }];

        Ok(Resolution {
            request,
            transaction,
            events,
        })
    }

    /// Student withdrawal of their own still-pending request.
    #[instrument(skip(self))]
    pub async fn cancel(&self, request_id: Uuid, student_id: Uuid) -> Result<Resolution> {
        let txn = self.db.begin().await?;
        let request = self.find_and_lock_request(request_id, &txn).await?;

        if let Some(err) = self.mark_expired_if_stale(&request, &txn).await? {
            txn.commit().await?;
            return Err(err);
        }
        if request.student_id != student_id {
            txn.rollback().await?;
            return Err(ApiError::UnauthorizedApprover(format!(
                "Student {} did not create approval request {}",
                student_id, request_id
            )));
        }
        if request.status != ApprovalStatus::Pending {
            let err = already_resolved(&request);
            txn.rollback().await?;
            return Err(err);
        }

        let now = OffsetDateTime::now_utc();
        let mut active: entity::approval_requests::ActiveModel = request.into();
        active.status = Set(ApprovalStatus::Cancelled);
        active.resolved_at = Set(Some(now));
        active.updated_at = Set(now);
        let request = active.update(&txn).await?;

        txn.commit().await?;

        info!("Approval request {} cancelled by student", request.id);

        let events = vec![DomainEvent::ApprovalResolved {
            request_id: request.id,
            student_id: request.student_id,
            parent_id: request.parent_id,
            status: request.status,
            transaction_id: None,
        }];

        Ok(Resolution {
            request,
            transaction: None,
            events,
        })
    }

    /// Pending requests awaiting a parent, oldest first. Requests already
    /// past expiry are excluded; the sweep or the next action marks them.
    #[instrument(skip(self))]
    pub async fn pending_for_parent(
        &self,
        parent_id: Uuid,
    ) -> Result<Vec<entity::approval_requests::Model>> {
        let now = OffsetDateTime::now_utc();
        let requests = entity::approval_requests::Entity::find()
            .filter(entity::approval_requests::Column::ParentId.eq(parent_id))
            .filter(entity::approval_requests::Column::Status.eq(ApprovalStatus::Pending))
            .filter(entity::approval_requests::Column::ExpiresAt.gt(now))
            .order_by_asc(entity::approval_requests::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(requests)
    }

    /// Mark every pending request past its deadline as expired. Returns
    /// how many rows were swept.
    #[instrument(skip(self))]
    pub async fn expire_stale(&self) -> Result<u64> {
        let now = OffsetDateTime::now_utc();
        let result = entity::approval_requests::Entity::update_many()
            .col_expr(
                entity::approval_requests::Column::Status,
                Expr::value(ApprovalStatus::Expired),
            )
            .col_expr(entity::approval_requests::Column::UpdatedAt, Expr::value(now))
            .filter(entity::approval_requests::Column::Status.eq(ApprovalStatus::Pending))
            .filter(entity::approval_requests::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            info!("Expired {} stale approval requests", result.rows_affected);
        }

        Ok(result.rows_affected)
    }

    /// Lazy expiry inside the caller's transaction: returns the error the
    /// caller must surface after committing the expiry transition.
    async fn mark_expired_if_stale(
        &self,
        request: &entity::approval_requests::Model,
        txn: &DatabaseTransaction,
    ) -> Result<Option<ApiError>> {
        let now = OffsetDateTime::now_utc();
        if request.status == ApprovalStatus::Pending && now >= request.expires_at {
            let mut active: entity::approval_requests::ActiveModel = request.clone().into();
            active.status = Set(ApprovalStatus::Expired);
            active.updated_at = Set(now);
            active.update(txn).await?;
            return Ok(Some(ApiError::AlreadyExpired(request.id)));
        }

        Ok(None)
    }

    async fn find_and_lock_request(
        &self,
        request_id: Uuid,
        txn: &DatabaseTransaction,
    ) -> Result<entity::approval_requests::Model> {
        entity::approval_requests::Entity::find_by_id(request_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Approval request {} not found", request_id))
            })
    }

    async fn load_plan(
        &self,
        plan_id: Option<Uuid>,
        conn: &impl ConnectionTrait,
    ) -> Result<Option<entity::pricing_plans::Model>> {
        let Some(plan_id) = plan_id else {
            return Ok(None);
        };

        let plan = entity::pricing_plans::Entity::find_by_id(plan_id)
            .filter(entity::pricing_plans::Column::IsActive.eq(true))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ApiError::BadRequest(format!("Pricing plan {} not found or inactive", plan_id))
            })?;

        Ok(Some(plan))
    }

    /// Build the pending transaction a (possibly auto-) approved intent
    /// turns into. Hours and validity come from the plan's typed columns.
    async fn create_transaction(
        &self,
        student_id: Uuid,
        amount: rust_decimal::Decimal,
        request_type: ApprovalRequestType,
        plan: Option<&entity::pricing_plans::Model>,
        conn: &impl ConnectionTrait,
    ) -> Result<entity::transactions::Model> {
        let now = OffsetDateTime::now_utc();
        let kind = transaction_kind_for(request_type);

        let hours_quantity = plan
            .map(|plan| plan.hours_included)
            .unwrap_or(rust_decimal::Decimal::ZERO);
        let expires_at = plan
            .and_then(|plan| plan.validity_days)
            .map(|days| now + time::Duration::days(i64::from(days)));

        let transaction = entity::transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(student_id),
            amount: Set(amount),
            kind: Set(kind),
            status: Set(TransactionStatus::Pending),
            hours_quantity: Set(hours_quantity),
            pricing_plan_id: Set(plan.map(|plan| plan.id)),
            gateway_reference: Set(None),
            expires_at: Set(expires_at),
            metadata: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(transaction.insert(conn).await?)
    }
}

fn transaction_kind_for(request_type: ApprovalRequestType) -> TransactionKind {
    match request_type {
        ApprovalRequestType::Hours => TransactionKind::Package,
        ApprovalRequestType::Subscription => TransactionKind::Subscription,
        ApprovalRequestType::Session => TransactionKind::SessionTopup,
    }
}

fn already_resolved(request: &entity::approval_requests::Model) -> ApiError {
    match request.transaction_id {
        Some(transaction_id) => ApiError::InvalidState(format!(
            "Approval request {} already {:?} (transaction {})",
            request.id, request.status, transaction_id
        )),
        None => ApiError::InvalidState(format!(
            "Approval request {} already {:?}",
            request.id, request.status
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_type_maps_to_transaction_kind() {
        assert_eq!(
            transaction_kind_for(ApprovalRequestType::Hours),
            TransactionKind::Package
        );
        assert_eq!(
            transaction_kind_for(ApprovalRequestType::Subscription),
            TransactionKind::Subscription
        );
        assert_eq!(
            transaction_kind_for(ApprovalRequestType::Session),
            TransactionKind::SessionTopup
        );
    }
}
