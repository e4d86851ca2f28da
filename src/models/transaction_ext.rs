/// Extension methods for the transactions entity
///
/// Business rules that complement the generated entity in
/// entity/src/transactions.rs: the payment state machine and the
/// crediting preconditions.
use entity::sea_orm_active_enums::{TransactionKind, TransactionStatus};
use entity::transactions;

pub trait StatusTransitions {
    /// Whether the state machine permits moving to `next`.
    ///
    /// pending -> processing -> completed, with failure/cancellation
    /// reachable from any non-terminal state. A confirmation may land
    /// before we record the processing step, so pending -> completed is
    /// treated as the collapsed chain. completed -> refunded is the only
    /// exit from a terminal state.
    fn can_transition_to(&self, next: &TransactionStatus) -> bool;

    fn is_terminal(&self) -> bool;
}

impl StatusTransitions for TransactionStatus {
    fn can_transition_to(&self, next: &TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Completed)
                | (Processing, Completed)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Completed, Refunded)
        )
    }

    fn is_terminal(&self) -> bool {
        use TransactionStatus::*;
        matches!(self, Completed | Failed | Cancelled | Refunded)
    }
}

pub trait TransactionExt {
    /// Whether this transaction may credit hours to a ledger: completed,
    /// and of a kind that buys hours.
    fn is_hour_creditable(&self) -> bool;

    /// Whether this transaction may credit money only (session topups).
    fn is_topup(&self) -> bool;
}

impl TransactionExt for transactions::Model {
    fn is_hour_creditable(&self) -> bool {
        self.status == TransactionStatus::Completed
            && matches!(
                self.kind,
                TransactionKind::Package | TransactionKind::Subscription
            )
    }

    fn is_topup(&self) -> bool {
        self.kind == TransactionKind::SessionTopup
    }
}
