use crate::{
    config::GatewayConfig,
    error::{ApiError, Result},
    events::DomainEvent,
    models::transaction_ext::StatusTransitions,
    services::LedgerService,
};
use async_trait::async_trait;
use sea_orm::{entity::*, query::*, DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use entity::sea_orm_active_enums::{TransactionKind, TransactionStatus};

/// The payment gateway is an opaque collaborator: we hand it a
/// transaction, it hands back a reference, and later calls back with
/// confirmed or failed. Its own state machine is not mirrored here.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_payment(
        &self,
        transaction: &entity::transactions::Model,
    ) -> Result<String>;
}

pub struct HttpPaymentGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GatewayInitiateResponse {
    reference: String,
}

impl HttpPaymentGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            config: config.clone(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initiate_payment(
        &self,
        transaction: &entity::transactions::Model,
    ) -> Result<String> {
        let request_body = serde_json::json!({
            "externalId": transaction.id,
            "amount": transaction.amount,
            "description": format!("{:?} purchase", transaction.kind),
        });

        let response = self
            .http_client
            .post(format!("{}/payments", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .timeout(std::time::Duration::from_millis(
                self.config.request_timeout_ms,
            ))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ApiError::Gateway(format!("Failed to reach gateway: {}", e)))?;

        if !response.status().is_success() {
            return Err(ApiError::Gateway(format!(
                "Gateway rejected initiation with status {}",
                response.status()
            )));
        }

        let parsed: GatewayInitiateResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Gateway(format!("Invalid gateway response: {}", e)))?;

        Ok(parsed.reference)
    }
}

pub struct PaymentService {
    db: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    ledger_service: Arc<LedgerService>,
}

impl PaymentService {
    pub fn new(
        db: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
        ledger_service: Arc<LedgerService>,
    ) -> Self {
        Self {
            db,
            gateway,
            ledger_service,
        }
    }

    /// Hand a pending transaction to the gateway. On success the opaque
    /// reference is stored and the transaction moves to processing; on
    /// gateway failure it moves to failed with the reason in metadata.
    /// No retry here; reconciliation belongs to the integration layer.
    #[instrument(skip(self))]
    pub async fn initiate_payment(
        &self,
        transaction_id: Uuid,
    ) -> Result<entity::transactions::Model> {
        let transaction = self.find_transaction(transaction_id).await?;

        if !transaction
            .status
            .can_transition_to(&TransactionStatus::Processing)
        {
            return Err(ApiError::InvalidState(format!(
                "Transaction {} is {:?}, cannot initiate payment",
                transaction.id, transaction.status
            )));
        }

        match self.gateway.initiate_payment(&transaction).await {
            Ok(reference) => {
                let now = time::OffsetDateTime::now_utc();
                let mut active: entity::transactions::ActiveModel = transaction.into();
                active.gateway_reference = Set(Some(reference));
                active.status = Set(TransactionStatus::Processing);
                active.updated_at = Set(now);
                let updated = active.update(&self.db).await?;

                info!(
                    "Initiated payment for transaction {}: reference={:?}",
                    updated.id, updated.gateway_reference
                );
                Ok(updated)
            }
            Err(gateway_error) => {
                self.mark_failed(transaction, Some(gateway_error.to_string()))
                    .await?;
                Err(gateway_error)
            }
        }
    }

    /// Gateway confirmation callback. Idempotent under webhook retries:
    /// a transaction already completed returns as-is with no events, and
    /// the ledger credit underneath carries its own uniqueness guard.
    #[instrument(skip(self))]
    pub async fn on_payment_confirmed(
        &self,
        gateway_reference: &str,
    ) -> Result<(entity::transactions::Model, Vec<DomainEvent>)> {
        let txn = self.db.begin().await?;

        let transaction = entity::transactions::Entity::find()
            .filter(entity::transactions::Column::GatewayReference.eq(gateway_reference))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No transaction for gateway reference {}",
                    gateway_reference
                ))
            })?;

        if transaction.status == TransactionStatus::Completed {
            txn.rollback().await?;
            warn!(
                "Duplicate confirmation for transaction {} ignored",
                transaction.id
            );
            return Ok((transaction, Vec::new()));
        }

        if !transaction
            .status
            .can_transition_to(&TransactionStatus::Completed)
        {
            let err = ApiError::InvalidState(format!(
                "Transaction {} is {:?}, cannot complete",
                transaction.id, transaction.status
            ));
            txn.rollback().await?;
            return Err(err);
        }

        let now = time::OffsetDateTime::now_utc();
        let mut active: entity::transactions::ActiveModel = transaction.into();
        active.status = Set(TransactionStatus::Completed);
        active.updated_at = Set(now);
        let completed = active.update(&txn).await?;

        txn.commit().await?;

        // Ledger mutation happens only now, after the money is confirmed.
        let hours_credited = match completed.kind {
            TransactionKind::Package | TransactionKind::Subscription => {
                let (_, _remaining) = self
                    .ledger_service
                    .credit_from_transaction(&completed)
                    .await?;
                completed.hours_quantity
            }
            TransactionKind::SessionTopup => {
                self.ledger_service.apply_topup(&completed).await?;
                rust_decimal::Decimal::ZERO
            }
        };

        info!(
            "Payment confirmed for transaction {} ({} hours credited)",
            completed.id, hours_credited
        );

        let events = vec![DomainEvent::TransactionCompleted {
            transaction_id: completed.id,
            student_id: completed.student_id,
            amount: completed.amount,
            kind: completed.kind.clone(),
            hours_credited,
        }];

        Ok((completed, events))
    }

    /// Gateway failure callback. The transaction stays as the audit
    /// record, with the gateway's reason preserved.
    #[instrument(skip(self))]
    pub async fn on_payment_failed(
        &self,
        gateway_reference: &str,
        reason: Option<String>,
    ) -> Result<entity::transactions::Model> {
        let transaction = entity::transactions::Entity::find()
            .filter(entity::transactions::Column::GatewayReference.eq(gateway_reference))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No transaction for gateway reference {}",
                    gateway_reference
                ))
            })?;

        if transaction.status == TransactionStatus::Failed {
            return Ok(transaction);
        }
        if !transaction
            .status
            .can_transition_to(&TransactionStatus::Failed)
        {
            return Err(ApiError::InvalidState(format!(
                "Transaction {} is {:?}, cannot fail",
                transaction.id, transaction.status
            )));
        }

        self.mark_failed(transaction, reason).await
    }

    async fn mark_failed(
        &self,
        transaction: entity::transactions::Model,
        reason: Option<String>,
    ) -> Result<entity::transactions::Model> {
        let now = time::OffsetDateTime::now_utc();
        let metadata = failure_metadata(transaction.metadata.clone(), reason.as_deref());

        let id = transaction.id;
        let mut active: entity::transactions::ActiveModel = transaction.into();
        active.status = Set(TransactionStatus::Failed);
        active.metadata = Set(metadata);
        active.updated_at = Set(now);
        let updated = active.update(&self.db).await?;

        warn!("Payment failed for transaction {}: {:?}", id, reason);

        Ok(updated)
    }

    async fn find_transaction(
        &self,
        transaction_id: Uuid,
    ) -> Result<entity::transactions::Model> {
        entity::transactions::Entity::find_by_id(transaction_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Transaction {} not found", transaction_id)))
    }
}

/// Record the gateway's failure reason without clobbering other hints.
fn failure_metadata(
    existing: Option<serde_json::Value>,
    reason: Option<&str>,
) -> Option<serde_json::Value> {
    let reason = reason.unwrap_or("unspecified gateway failure");
    match existing {
        Some(serde_json::Value::Object(mut map)) => {
            map.insert(
                "failureReason".to_string(),
                serde_json::Value::String(reason.to_string()),
            );
            Some(serde_json::Value::Object(map))
        }
        _ => Some(serde_json::json!({ "failureReason": reason })),
    }
}
