use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// GET /ledgers/{student_id}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummaryResponse {
    pub student_id: Uuid,
    pub hours_purchased: Decimal,
    pub hours_consumed: Decimal,
    pub remaining_hours: Decimal,
    pub balance_amount: Decimal,
    pub consumptions: Vec<ConsumptionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionView {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub hours_consumed: Decimal,
    pub hours_reserved: Decimal,
    pub session_id: Option<Uuid>,
    pub is_refunded: bool,
    pub created_at: time::OffsetDateTime,
}

impl From<entity::consumption_records::Model> for ConsumptionView {
    fn from(record: entity::consumption_records::Model) -> Self {
        Self {
            id: record.id,
            transaction_id: record.transaction_id,
            hours_consumed: record.hours_consumed,
            hours_reserved: record.hours_reserved,
            session_id: record.session_id,
            is_refunded: record.is_refunded,
            created_at: record.created_at,
        }
    }
}

/// GET /ledgers/{student_id}/availability
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub hours: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub available: bool,
    pub remaining_hours: Decimal,
    pub hours_requested: Decimal,
}

/// POST /ledgers/{student_id}/consume — called by the booking subsystem
/// when a session completes.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRequest {
    pub hours: Decimal,
    /// The package purchase these hours are drawn from.
    pub transaction_id: Uuid,
    /// Hours held at booking time; defaults to `hours`.
    pub hours_reserved: Option<Decimal>,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeResponse {
    pub consumption: ConsumptionView,
    pub remaining_hours: Decimal,
}

/// POST /consumptions/{id}/refund
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub consumption: ConsumptionView,
    pub remaining_hours: Decimal,
}
