/// Extension methods for the hour_ledgers entity
use entity::hour_ledgers;
use rust_decimal::Decimal;

pub trait HourLedgerExt {
    /// Derived balance: purchased minus consumed. Never stored.
    fn remaining_hours(&self) -> Decimal;

    /// Whether `hours` can currently be consumed.
    fn has_available(&self, hours: Decimal) -> bool;
}

impl HourLedgerExt for hour_ledgers::Model {
    fn remaining_hours(&self) -> Decimal {
        self.hours_purchased - self.hours_consumed
    }

    fn has_available(&self, hours: Decimal) -> bool {
        self.remaining_hours() >= hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ledger(purchased: i64, consumed: i64) -> hour_ledgers::Model {
        let now = time::OffsetDateTime::now_utc();
        hour_ledgers::Model {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            hours_purchased: Decimal::from(purchased),
            hours_consumed: Decimal::from(consumed),
            balance_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_remaining_hours() {
        assert_eq!(ledger(10, 8).remaining_hours(), Decimal::from(2));
        assert_eq!(ledger(10, 10).remaining_hours(), Decimal::ZERO);
    }

    #[test]
    fn test_availability_boundary() {
        let l = ledger(10, 8);
        assert!(l.has_available(Decimal::from(2)));
        assert!(!l.has_available(Decimal::from(3)));
    }
}
