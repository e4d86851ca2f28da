use crate::helpers::{
    build_approval_service, seed_guardian_link, seed_pending_request, seed_policy,
    seed_pricing_plan, seed_transaction, setup_test_db,
};
use aprende::error::ApiError;
use aprende::models::approvals::{PurchaseOutcome, PurchaseRequest};
use aprende::models::budget::DecisionReason;
use aprende::models::common::ApprovalDecision;
use entity::sea_orm_active_enums::{
    ApprovalRequestType, ApprovalStatus, TransactionKind, TransactionStatus,
};
use rust_decimal::Decimal;
use sea_orm::{entity::*, query::*, PaginatorTrait};
use uuid::Uuid;

fn purchase(
    student_id: Uuid,
    amount: i64,
    request_type: ApprovalRequestType,
    pricing_plan_id: Option<Uuid>,
) -> PurchaseRequest {
    PurchaseRequest {
        student_id,
        amount: Decimal::from(amount),
        request_type,
        description: "test purchase".to_string(),
        pricing_plan_id,
        session_id: None,
    }
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_small_purchase_auto_approved() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    // monthly_limit=100, threshold=20, sessions do not need sign-off
    let (student_id, _, link_id) = seed_guardian_link(&db).await;
    seed_policy(&db, link_id, Some(100), None, 20, false, true).await;
    seed_transaction(
        &db,
        student_id,
        50,
        TransactionKind::Package,
        TransactionStatus::Completed,
        5,
    )
    .await;

    // 15 <= threshold and 50+15 <= 100: transaction created directly
    let requested = service
        .request_purchase(&purchase(student_id, 15, ApprovalRequestType::Session, None))
        .await
        .unwrap();

    assert_eq!(requested.decision.reason, DecisionReason::AutoApproved);
    assert_eq!(requested.decision.current_month_spent, Decimal::from(50));
    match requested.outcome {
        PurchaseOutcome::AutoApproved { transaction } => {
            assert_eq!(transaction.status, TransactionStatus::Pending);
            assert_eq!(transaction.amount, Decimal::from(15));
            assert_eq!(transaction.kind, TransactionKind::SessionTopup);
        }
        PurchaseOutcome::PendingApproval { .. } => panic!("Expected auto-approval"),
    }
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_over_budget_purchase_parked_for_approval() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, parent_id, link_id) = seed_guardian_link(&db).await;
    seed_policy(&db, link_id, Some(100), None, 20, false, true).await;
    seed_transaction(
        &db,
        student_id,
        50,
        TransactionKind::Package,
        TransactionStatus::Completed,
        5,
    )
    .await;

    // 50+60 > 100: held for sign-off, no transaction yet
    let requested = service
        .request_purchase(&purchase(student_id, 60, ApprovalRequestType::Session, None))
        .await
        .unwrap();

    assert_eq!(requested.decision.reason, DecisionReason::BudgetExceeded);
    assert!(!requested.decision.allowed);
    let request = match requested.outcome {
        PurchaseOutcome::PendingApproval { request } => request,
        PurchaseOutcome::AutoApproved { .. } => panic!("Expected pending approval"),
    };
    assert_eq!(request.status, ApprovalStatus::Pending);
    assert_eq!(request.parent_id, parent_id);
    assert_eq!(request.transaction_id, None);

    // A budget-exceeded warning event accompanies the approval request
    assert_eq!(requested.events.len(), 2);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_no_policy_means_unrestricted() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, _, _) = seed_guardian_link(&db).await;

    let requested = service
        .request_purchase(&purchase(student_id, 500, ApprovalRequestType::Session, None))
        .await
        .unwrap();

    assert_eq!(requested.decision.reason, DecisionReason::NoPolicy);
    assert!(matches!(
        requested.outcome,
        PurchaseOutcome::AutoApproved { .. }
    ));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_approve_creates_exactly_one_transaction() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, parent_id, link_id) = seed_guardian_link(&db).await;
    seed_policy(&db, link_id, None, None, 0, true, true).await;
    let plan = seed_pricing_plan(&db, 10, 80).await;

    let requested = service
        .request_purchase(&purchase(
            student_id,
            80,
            ApprovalRequestType::Hours,
            Some(plan.id),
        ))
        .await
        .unwrap();
    let request = match requested.outcome {
        PurchaseOutcome::PendingApproval { request } => request,
        PurchaseOutcome::AutoApproved { .. } => panic!("Expected pending approval"),
    };

    let resolution = service
        .resolve(
            request.id,
            parent_id,
            ApprovalDecision::Approve,
            Some("ok before exams".to_string()),
        )
        .await
        .unwrap();

    let transaction = resolution.transaction.expect("approval creates a transaction");
    assert_eq!(transaction.hours_quantity, Decimal::from(10));
    assert_eq!(transaction.kind, TransactionKind::Package);
    assert_eq!(resolution.request.status, ApprovalStatus::Approved);
    assert_eq!(resolution.request.transaction_id, Some(transaction.id));

    // Re-resolving is rejected and creates nothing new
    let again = service
        .resolve(request.id, parent_id, ApprovalDecision::Approve, None)
        .await;
    assert!(matches!(again, Err(ApiError::InvalidState(_))));

    let count = entity::transactions::Entity::find()
        .filter(entity::transactions::Column::StudentId.eq(student_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_deny_creates_no_transaction() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, parent_id, link_id) = seed_guardian_link(&db).await;
    let policy = seed_policy(&db, link_id, None, None, 0, true, true).await;
    let request = seed_pending_request(
        &db,
        student_id,
        parent_id,
        policy.id,
        30,
        time::OffsetDateTime::now_utc() + time::Duration::hours(24),
    )
    .await;

    let resolution = service
        .resolve(
            request.id,
            parent_id,
            ApprovalDecision::Deny,
            Some("not this week".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(resolution.request.status, ApprovalStatus::Denied);
    assert_eq!(
        resolution.request.parent_response.as_deref(),
        Some("not this week")
    );
    assert!(resolution.transaction.is_none());

    let count = entity::transactions::Entity::find()
        .filter(entity::transactions::Column::StudentId.eq(student_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_wrong_parent_cannot_resolve() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, parent_id, link_id) = seed_guardian_link(&db).await;
    let policy = seed_policy(&db, link_id, None, None, 0, true, true).await;
    let request = seed_pending_request(
        &db,
        student_id,
        parent_id,
        policy.id,
        30,
        time::OffsetDateTime::now_utc() + time::Duration::hours(24),
    )
    .await;

    let intruder = Uuid::new_v4();
    let result = service
        .resolve(request.id, intruder, ApprovalDecision::Approve, None)
        .await;
    assert!(matches!(result, Err(ApiError::UnauthorizedApprover(_))));

    // State is untouched
    let reloaded = entity::approval_requests::Entity::find_by_id(request.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, ApprovalStatus::Pending);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_expired_request_is_marked_then_rejected() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, parent_id, link_id) = seed_guardian_link(&db).await;
    let policy = seed_policy(&db, link_id, None, None, 0, true, true).await;
    // Created past its deadline: T+25h against a 24h expiry
    let request = seed_pending_request(
        &db,
        student_id,
        parent_id,
        policy.id,
        30,
        time::OffsetDateTime::now_utc() - time::Duration::hours(1),
    )
    .await;

    let result = service
        .resolve(request.id, parent_id, ApprovalDecision::Approve, None)
        .await;
    assert!(matches!(result, Err(ApiError::AlreadyExpired(id)) if id == request.id));

    // The lazy check transitioned the row before rejecting the action
    let reloaded = entity::approval_requests::Entity::find_by_id(request.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.status, ApprovalStatus::Expired);
    assert_eq!(reloaded.transaction_id, None);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_student_cancels_own_pending_request() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, parent_id, link_id) = seed_guardian_link(&db).await;
    let policy = seed_policy(&db, link_id, None, None, 0, true, true).await;
    let request = seed_pending_request(
        &db,
        student_id,
        parent_id,
        policy.id,
        30,
        time::OffsetDateTime::now_utc() + time::Duration::hours(24),
    )
    .await;

    // Someone else's cancellation is rejected
    let result = service.cancel(request.id, Uuid::new_v4()).await;
    assert!(matches!(result, Err(ApiError::UnauthorizedApprover(_))));

    let resolution = service.cancel(request.id, student_id).await.unwrap();
    assert_eq!(resolution.request.status, ApprovalStatus::Cancelled);
    assert!(resolution.transaction.is_none());

    // Cancelled is terminal: the parent can no longer approve
    let late = service
        .resolve(request.id, parent_id, ApprovalDecision::Approve, None)
        .await;
    assert!(matches!(late, Err(ApiError::InvalidState(_))));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_expiry_sweep_marks_stale_requests() {
    let db = setup_test_db().await;
    let service = build_approval_service(&db);

    let (student_id, parent_id, link_id) = seed_guardian_link(&db).await;
    let policy = seed_policy(&db, link_id, None, None, 0, true, true).await;

    let stale = seed_pending_request(
        &db,
        student_id,
        parent_id,
        policy.id,
        30,
        time::OffsetDateTime::now_utc() - time::Duration::minutes(5),
    )
    .await;
    let fresh = seed_pending_request(
        &db,
        student_id,
        parent_id,
        policy.id,
        30,
        time::OffsetDateTime::now_utc() + time::Duration::hours(24),
    )
    .await;

    let swept = service.expire_stale().await.unwrap();
    assert!(swept >= 1);

    let stale = entity::approval_requests::Entity::find_by_id(stale.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stale.status, ApprovalStatus::Expired);

    let fresh = entity::approval_requests::Entity::find_by_id(fresh.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.status, ApprovalStatus::Pending);
}
