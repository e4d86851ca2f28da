/// Concurrency tests for the ledger and the approval state machine.
///
/// Each test fans out conflicting operations and asserts that exactly
/// the permitted number succeed, with the rest failing on the typed
/// error rather than corrupting state or surfacing a 500.
use crate::helpers::{
    build_approval_service, seed_guardian_link, seed_pending_request, seed_policy,
    seed_transaction, setup_test_db,
};
use aprende::error::ApiError;
use aprende::models::common::ApprovalDecision;
use aprende::services::LedgerService;
use entity::sea_orm_active_enums::{TransactionKind, TransactionStatus};
use rust_decimal::Decimal;
use sea_orm::{entity::*, query::*, PaginatorTrait};
use std::sync::Arc;
use tokio::task::JoinSet;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_concurrent_duplicate_credits() {
    let db = setup_test_db().await;
    let service = Arc::new(LedgerService::new(db.clone()));

    let (student_id, _, _) = seed_guardian_link(&db).await;
    let purchase = seed_transaction(
        &db,
        student_id,
        100,
        TransactionKind::Package,
        TransactionStatus::Completed,
        10,
    )
    .await;

    // Five simultaneous confirmations of the SAME transaction
    let mut tasks = JoinSet::new();
    for i in 0..5 {
        let service = service.clone();
        let purchase = purchase.clone();
        tasks.spawn(async move { (i, service.credit_from_transaction(&purchase).await) });
    }

    let mut success_count = 0;
    let mut duplicate_count = 0;
    let mut other_error_count = 0;

    while let Some(result) = tasks.join_next().await {
        match result {
            Ok((_, Ok(_))) => success_count += 1,
            Ok((_, Err(ApiError::AlreadyCredited(_)))) => duplicate_count += 1,
            Ok((task_id, Err(e))) => {
                println!("Task {} got unexpected error: {}", task_id, e);
                other_error_count += 1;
            }
            Err(e) => {
                println!("Task panicked: {:?}", e);
                other_error_count += 1;
            }
        }
    }

    assert_eq!(success_count, 1, "Expected exactly 1 successful credit");
    assert_eq!(duplicate_count, 4, "Expected 4 AlreadyCredited rejections");
    assert_eq!(other_error_count, 0, "Expected no other errors or panics");

    // The ledger was credited exactly once
    let service = LedgerService::new(db);
    let summary = service.summary(student_id).await.unwrap();
    assert_eq!(summary.hours_purchased, Decimal::from(10));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_concurrent_consumption_cannot_overdraw() {
    let db = setup_test_db().await;
    let service = Arc::new(LedgerService::new(db.clone()));

    let (student_id, _, _) = seed_guardian_link(&db).await;
    let purchase = seed_transaction(
        &db,
        student_id,
        100,
        TransactionKind::Package,
        TransactionStatus::Completed,
        10,
    )
    .await;
    service.credit_from_transaction(&purchase).await.unwrap();

    // Five bookings of 3 hours each against a 10-hour balance: only
    // three can fit.
    let mut tasks = JoinSet::new();
    for _ in 0..5 {
        let service = service.clone();
        let transaction_id = purchase.id;
        tasks.spawn(async move {
            service
                .consume(student_id, Decimal::from(3), transaction_id, None, None)
                .await
        });
    }

    let mut success_count = 0;
    let mut insufficient_count = 0;

    while let Some(result) = tasks.join_next().await {
        match result.expect("task must not panic") {
            Ok(_) => success_count += 1,
            Err(ApiError::InsufficientBalance { .. }) => insufficient_count += 1,
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    assert_eq!(success_count, 3, "Only 3 bookings of 3h fit into 10h");
    assert_eq!(insufficient_count, 2);

    let summary = service.summary(student_id).await.unwrap();
    assert_eq!(summary.hours_consumed, Decimal::from(9));
    assert_eq!(summary.remaining_hours, Decimal::from(1));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_concurrent_resolution_single_winner() {
    let db = setup_test_db().await;
    let service = Arc::new(build_approval_service(&db));

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

    // Double-click: two approvals race on the same request
    let mut tasks = JoinSet::new();
    for _ in 0..2 {
        let service = service.clone();
        let request_id = request.id;
        tasks.spawn(async move {
            service
                .resolve(request_id, parent_id, ApprovalDecision::Approve, None)
                .await
        });
    }

    let mut success_count = 0;
    let mut invalid_state_count = 0;

    while let Some(result) = tasks.join_next().await {
        match result.expect("task must not panic") {
            Ok(_) => success_count += 1,
            Err(ApiError::InvalidState(_)) => invalid_state_count += 1,
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    assert_eq!(success_count, 1, "Exactly one resolver wins");
    assert_eq!(invalid_state_count, 1, "The loser observes InvalidState");

    // Exactly one transaction exists for the approval
    let count = entity::transactions::Entity::find()
        .filter(entity::transactions::Column::StudentId.eq(student_id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
