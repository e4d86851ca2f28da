use entity::sea_orm_active_enums::{ApprovalRequestType, ApprovalStatus, TransactionKind};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Domain events emitted by core operations as plain data. Delivery
/// (push notifications, email) belongs to the notification subsystem;
/// operations return these and the route layer hands them to the sink,
/// so no service carries hidden side effects.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    ApprovalRequested {
        request_id: Uuid,
        student_id: Uuid,
        parent_id: Uuid,
        amount: Decimal,
        request_type: ApprovalRequestType,
    },
    ApprovalResolved {
        request_id: Uuid,
        student_id: Uuid,
        parent_id: Uuid,
        status: ApprovalStatus,
        transaction_id: Option<Uuid>,
    },
    BudgetExceededWarning {
        student_id: Uuid,
        parent_id: Uuid,
        amount: Decimal,
        current_month_spent: Decimal,
        current_week_spent: Decimal,
    },
    TransactionCompleted {
        transaction_id: Uuid,
        student_id: Uuid,
        amount: Decimal,
        kind: TransactionKind,
        hours_credited: Decimal,
    },
}

pub trait EventSink: Send + Sync {
    fn publish(&self, event: DomainEvent);

    fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

/// Default sink: structured log line per event. A real deployment swaps
/// in a queue-backed sink behind the same trait.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: DomainEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::info!(event = %payload, "domain event"),
            Err(e) => tracing::error!("Failed to serialize domain event: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DomainEvent::BudgetExceededWarning {
            student_id: Uuid::new_v4(),
            parent_id: Uuid::new_v4(),
            amount: Decimal::from(60),
            current_month_spent: Decimal::from(50),
            current_week_spent: Decimal::from(10),
        };

        let payload = serde_json::to_value(&event).unwrap();
        assert_eq!(payload["type"], "budget_exceeded_warning");
        assert_eq!(payload["amount"], "60");
    }
}
