use crate::{
    error::{ApiError, Result},
    models::{
        ledger::{AvailabilityResponse, ConsumptionView, LedgerSummaryResponse},
        ledger_ext::HourLedgerExt,
        transaction_ext::TransactionExt,
    },
};
use anyhow::anyhow;
use rust_decimal::Decimal;
use sea_orm::{
    entity::*, query::*, sea_query::OnConflict, DatabaseConnection, DatabaseTransaction,
    TransactionTrait,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use entity::sea_orm_active_enums::{TransactionKind, TransactionStatus};

pub struct LedgerService {
    db: DatabaseConnection,
}

impl LedgerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Apply a completed hours purchase (package or subscription) to the
    /// student's ledger. Idempotent: the unique ledger_credits row per
    /// transaction means a duplicate confirmation cannot double-credit.
    #[instrument(skip(self, transaction))]
    pub async fn credit_from_transaction(
        &self,
        transaction: &entity::transactions::Model,
    ) -> Result<(entity::hour_ledgers::Model, Decimal)> {
        if transaction.status != TransactionStatus::Completed {
            return Err(ApiError::InvalidState(format!(
                "Transaction {} is not completed, cannot credit ledger",
                transaction.id
            )));
        }
        if !transaction.is_hour_creditable() {
            return Err(ApiError::BadRequest(format!(
                "Transaction {} has kind {:?}, which does not buy hours",
                transaction.id, transaction.kind
            )));
        }

        self.apply_credit(transaction, transaction.hours_quantity)
            .await
    }

    /// Apply a completed session topup: money only, no hours. Shares the
    /// idempotency guard with hour credits.
    #[instrument(skip(self, transaction))]
    pub async fn apply_topup(
        &self,
        transaction: &entity::transactions::Model,
    ) -> Result<(entity::hour_ledgers::Model, Decimal)> {
        if transaction.status != TransactionStatus::Completed {
            return Err(ApiError::InvalidState(format!(
                "Transaction {} is not completed, cannot credit ledger",
                transaction.id
            )));
        }
        if transaction.kind != TransactionKind::SessionTopup {
            return Err(ApiError::BadRequest(format!(
                "Transaction {} is not a session topup",
                transaction.id
            )));
        }

        self.apply_credit(transaction, Decimal::ZERO).await
    }

    async fn apply_credit(
        &self,
        transaction: &entity::transactions::Model,
        hours: Decimal,
    ) -> Result<(entity::hour_ledgers::Model, Decimal)> {
        let txn = self.db.begin().await?;

        let ledger = self
            .find_and_lock_ledger(transaction.student_id, &txn)
            .await?;

        let now = time::OffsetDateTime::now_utc();
        let credit_id = Uuid::new_v4();

        let new_credit = entity::ledger_credits::ActiveModel {
            id: Set(credit_id),
            ledger_id: Set(ledger.id),
            transaction_id: Set(transaction.id),
            hours_credited: Set(hours),
            amount_credited: Set(transaction.amount),
            created_at: Set(now),
        };

        // Insert atomically; if this transaction was already applied, do
        // nothing instead of erroring.
        entity::ledger_credits::Entity::insert(new_credit)
            .on_conflict(
                OnConflict::column(entity::ledger_credits::Column::TransactionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&txn)
            .await?;

        // Check whether this credit was inserted or already existed
        let persisted = entity::ledger_credits::Entity::find()
            .filter(entity::ledger_credits::Column::TransactionId.eq(transaction.id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to read ledger credit after insert for transaction {}",
                    transaction.id
                ))
            })?;

        if persisted.id != credit_id {
            // Another confirmation already credited this transaction
            txn.rollback().await?;
            error!(
                "Duplicate credit attempt for transaction {} (applied at {})",
                transaction.id, persisted.created_at
            );
            return Err(ApiError::AlreadyCredited(transaction.id));
        }

        let mut ledger_active: entity::hour_ledgers::ActiveModel = ledger.into();
        let purchased = *ledger_active.hours_purchased.as_ref();
        let balance = *ledger_active.balance_amount.as_ref();
        ledger_active.hours_purchased = Set(purchased + hours);
        ledger_active.balance_amount = Set(balance + transaction.amount);
        ledger_active.updated_at = Set(now);
        let updated = ledger_active.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Credited ledger {}: transaction={}, hours={}, amount={}",
            updated.id, transaction.id, hours, transaction.amount
        );

        Ok((updated.clone(), updated.remaining_hours()))
    }

    /// Side-effect-free availability check for the booking subsystem.
    #[instrument(skip(self))]
    pub async fn check_availability(
        &self,
        student_id: Uuid,
        hours: Decimal,
    ) -> Result<AvailabilityResponse> {
        let remaining = entity::hour_ledgers::Entity::find()
            .filter(entity::hour_ledgers::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await?
            .map(|ledger| ledger.remaining_hours())
            .unwrap_or(Decimal::ZERO);

        Ok(AvailabilityResponse {
            available: remaining >= hours,
            remaining_hours: remaining,
            hours_requested: hours,
        })
    }

    /// Deduct hours at session completion. The availability check and the
    /// deduction run under one exclusive row lock, so two concurrent
    /// bookings cannot both spend the last hours.
    #[instrument(skip(self))]
    pub async fn consume(
        &self,
        student_id: Uuid,
        hours: Decimal,
        originating_transaction_id: Uuid,
        hours_reserved: Option<Decimal>,
        session_id: Option<Uuid>,
    ) -> Result<(entity::consumption_records::Model, Decimal)> {
        if hours <= Decimal::ZERO {
            return Err(ApiError::BadRequest(
                "Consumed hours must be positive".to_string(),
            ));
        }
        let reserved = hours_reserved.unwrap_or(hours);
        if reserved < hours {
            return Err(ApiError::BadRequest(format!(
                "Reserved hours {} cannot be below consumed hours {}",
                reserved, hours
            )));
        }

        let txn = self.db.begin().await?;

        let ledger = self.find_and_lock_ledger(student_id, &txn).await?;

        // Provenance: the hours must come from a purchase that actually
        // credited this ledger.
        let credited = entity::ledger_credits::Entity::find()
            .filter(entity::ledger_credits::Column::LedgerId.eq(ledger.id))
            .filter(entity::ledger_credits::Column::TransactionId.eq(originating_transaction_id))
            .one(&txn)
            .await?;
        if credited.is_none() {
            txn.rollback().await?;
            return Err(ApiError::BadRequest(format!(
                "Transaction {} was never credited to this ledger",
                originating_transaction_id
            )));
        }

        let remaining = ledger.remaining_hours();
        if remaining < hours {
            txn.rollback().await?;
            return Err(ApiError::InsufficientBalance {
                requested: hours,
                remaining,
            });
        }

        let now = time::OffsetDateTime::now_utc();
        let record = entity::consumption_records::ActiveModel {
            id: Set(Uuid::new_v4()),
            ledger_id: Set(ledger.id),
            transaction_id: Set(originating_transaction_id),
            hours_consumed: Set(hours),
            hours_reserved: Set(reserved),
            session_id: Set(session_id),
            is_refunded: Set(false),
            refund_reason: Set(None),
            refunded_at: Set(None),
            created_at: Set(now),
        };
        let record = record.insert(&txn).await?;

        let mut ledger_active: entity::hour_ledgers::ActiveModel = ledger.into();
        let consumed = *ledger_active.hours_consumed.as_ref();
        ledger_active.hours_consumed = Set(consumed + hours);
        ledger_active.updated_at = Set(now);
        let updated = ledger_active.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Consumed {} hours for student {} (remaining: {})",
            hours,
            student_id,
            updated.remaining_hours()
        );

        Ok((record, updated.remaining_hours()))
    }

    /// Refund one consumption record, restoring its hours. Amounts are
    /// immutable; only the refund flag and reason change.
    #[instrument(skip(self))]
    pub async fn reverse_consumption(
        &self,
        consumption_id: Uuid,
        reason: &str,
    ) -> Result<(entity::consumption_records::Model, Decimal)> {
        let txn = self.db.begin().await?;

        let record = entity::consumption_records::Entity::find_by_id(consumption_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("Consumption record {} not found", consumption_id))
            })?;

        if record.is_refunded {
            txn.rollback().await?;
            return Err(ApiError::AlreadyRefunded(consumption_id));
        }

        let ledger = entity::hour_ledgers::Entity::find_by_id(record.ledger_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Ledger {} missing for consumption record {}",
                    record.ledger_id,
                    consumption_id
                ))
            })?;

        let restored = ledger.hours_consumed - record.hours_consumed;
        if restored < Decimal::ZERO {
            // Consumed total below a single record's hours means the
            // books are corrupt; refuse rather than coerce.
            txn.rollback().await?;
            error!(
                "Ledger {} hours_consumed {} below record {} hours {}",
                ledger.id, ledger.hours_consumed, record.id, record.hours_consumed
            );
            return Err(ApiError::Internal(anyhow!(
                "Ledger consumption total out of sync with records"
            )));
        }

        let now = time::OffsetDateTime::now_utc();

        let mut record_active: entity::consumption_records::ActiveModel = record.into();
        record_active.is_refunded = Set(true);
        record_active.refund_reason = Set(Some(reason.to_string()));
        record_active.refunded_at = Set(Some(now));
        let record = record_active.update(&txn).await?;

        let mut ledger_active: entity::hour_ledgers::ActiveModel = ledger.into();
        ledger_active.hours_consumed = Set(restored);
        ledger_active.updated_at = Set(now);
        let updated = ledger_active.update(&txn).await?;

        txn.commit().await?;

        info!(
            "Refunded consumption {} ({} hours restored, remaining: {})",
            consumption_id,
            record.hours_consumed,
            updated.remaining_hours()
        );

        Ok((record, updated.remaining_hours()))
    }

    /// Ledger summary with consumption history. Reads never create a
    /// ledger; a student with no completed purchase reports zeros.
    #[instrument(skip(self))]
    pub async fn summary(&self, student_id: Uuid) -> Result<LedgerSummaryResponse> {
        let ledger = entity::hour_ledgers::Entity::find()
            .filter(entity::hour_ledgers::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await?;

        let Some(ledger) = ledger else {
            return Ok(LedgerSummaryResponse {
                student_id,
                hours_purchased: Decimal::ZERO,
                hours_consumed: Decimal::ZERO,
                remaining_hours: Decimal::ZERO,
                balance_amount: Decimal::ZERO,
                consumptions: Vec::new(),
            });
        };

        let consumptions = entity::consumption_records::Entity::find()
            .filter(entity::consumption_records::Column::LedgerId.eq(ledger.id))
            .order_by_desc(entity::consumption_records::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ConsumptionView::from)
            .collect();

        Ok(LedgerSummaryResponse {
            student_id,
            hours_purchased: ledger.hours_purchased,
            hours_consumed: ledger.hours_consumed,
            remaining_hours: ledger.remaining_hours(),
            balance_amount: ledger.balance_amount,
            consumptions,
        })
    }

    /// Helper: Find and lock the student's ledger for update, creating it
    /// lazily on first use (no-op insert if another transaction races).
    async fn find_and_lock_ledger(
        &self,
        student_id: Uuid,
        txn: &DatabaseTransaction,
    ) -> Result<entity::hour_ledgers::Model> {
        let ledger = entity::hour_ledgers::Entity::find()
            .filter(entity::hour_ledgers::Column::StudentId.eq(student_id))
            .lock_exclusive()
            .one(txn)
            .await?;

        if let Some(ledger) = ledger {
            return Ok(ledger);
        }

        let now = time::OffsetDateTime::now_utc();
        let new_ledger = entity::hour_ledgers::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(student_id),
            hours_purchased: Set(Decimal::ZERO),
            hours_consumed: Set(Decimal::ZERO),
            balance_amount: Set(Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
        };

        entity::hour_ledgers::Entity::insert(new_ledger)
            .on_conflict(
                OnConflict::column(entity::hour_ledgers::Column::StudentId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(txn)
            .await?;

        entity::hour_ledgers::Entity::find()
            .filter(entity::hour_ledgers::Column::StudentId.eq(student_id))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!("Failed to create or lock hour ledger record"))
            })
    }
}
