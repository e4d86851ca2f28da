use crate::helpers::{seed_guardian_link, seed_transaction, setup_test_db};
use aprende::error::ApiError;
use aprende::services::LedgerService;
use entity::sea_orm_active_enums::{TransactionKind, TransactionStatus};
use rust_decimal::Decimal;

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_credit_from_transaction_is_idempotent() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

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

    // First application credits the ledger
    let (ledger, remaining) = service.credit_from_transaction(&purchase).await.unwrap();
    assert_eq!(ledger.hours_purchased, Decimal::from(10));
    assert_eq!(remaining, Decimal::from(10));

    // Second application must not double-credit
    let duplicate = service.credit_from_transaction(&purchase).await;
    assert!(matches!(duplicate, Err(ApiError::AlreadyCredited(id)) if id == purchase.id));

    let summary = service.summary(student_id).await.unwrap();
    assert_eq!(summary.hours_purchased, Decimal::from(10));
    assert_eq!(summary.balance_amount, Decimal::from(100));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_credit_rejects_incomplete_transaction() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

    let (student_id, _, _) = seed_guardian_link(&db).await;
    let pending = seed_transaction(
        &db,
        student_id,
        100,
        TransactionKind::Package,
        TransactionStatus::Pending,
        10,
    )
    .await;

    let result = service.credit_from_transaction(&pending).await;
    assert!(matches!(result, Err(ApiError::InvalidState(_))));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_consume_rejects_insufficient_balance() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

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

    // Bring the ledger to purchased=10, consumed=8
    service
        .consume(student_id, Decimal::from(8), purchase.id, None, None)
        .await
        .unwrap();

    // remaining=2, consuming 3 must fail and leave the ledger untouched
    let result = service
        .consume(student_id, Decimal::from(3), purchase.id, None, None)
        .await;
    assert!(matches!(
        result,
        Err(ApiError::InsufficientBalance { requested, remaining })
            if requested == Decimal::from(3) && remaining == Decimal::from(2)
    ));

    let summary = service.summary(student_id).await.unwrap();
    assert_eq!(summary.remaining_hours, Decimal::from(2));
    assert_eq!(summary.hours_consumed, Decimal::from(8));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_availability_check_is_side_effect_free() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

    let (student_id, _, _) = seed_guardian_link(&db).await;

    // Unknown student reports zero, and no ledger row appears
    let availability = service
        .check_availability(student_id, Decimal::from(1))
        .await
        .unwrap();
    assert!(!availability.available);
    assert_eq!(availability.remaining_hours, Decimal::ZERO);

    let summary = service.summary(student_id).await.unwrap();
    assert_eq!(summary.hours_purchased, Decimal::ZERO);
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_reverse_consumption_round_trip() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

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

    let (record, remaining) = service
        .consume(student_id, Decimal::from(4), purchase.id, None, None)
        .await
        .unwrap();
    assert_eq!(remaining, Decimal::from(6));

    // Refund restores the exact pre-consume balance
    let (refunded, remaining) = service
        .reverse_consumption(record.id, "session cancelled by teacher")
        .await
        .unwrap();
    assert!(refunded.is_refunded);
    assert_eq!(
        refunded.refund_reason.as_deref(),
        Some("session cancelled by teacher")
    );
    assert_eq!(remaining, Decimal::from(10));

    // A second refund of the same record is rejected
    let again = service.reverse_consumption(record.id, "double refund").await;
    assert!(matches!(again, Err(ApiError::AlreadyRefunded(id)) if id == record.id));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_consume_requires_credited_provenance() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

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

    // A transaction that never credited this ledger cannot be the source
    let stranger = seed_transaction(
        &db,
        student_id,
        50,
        TransactionKind::Package,
        TransactionStatus::Completed,
        5,
    )
    .await;

    let result = service
        .consume(student_id, Decimal::from(1), stranger.id, None, None)
        .await;
    assert!(matches!(result, Err(ApiError::BadRequest(_))));
}

#[tokio::test]
#[ignore] // Run only when database is available
async fn test_topup_credits_money_without_hours() {
    let db = setup_test_db().await;
    let service = LedgerService::new(db.clone());

    let (student_id, _, _) = seed_guardian_link(&db).await;
    let topup = seed_transaction(
        &db,
        student_id,
        25,
        TransactionKind::SessionTopup,
        TransactionStatus::Completed,
        0,
    )
    .await;

    service.apply_topup(&topup).await.unwrap();

    let summary = service.summary(student_id).await.unwrap();
    assert_eq!(summary.balance_amount, Decimal::from(25));
    assert_eq!(summary.hours_purchased, Decimal::ZERO);
}
