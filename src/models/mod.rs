// Request/Response models
pub mod approvals;
pub mod budget;
pub mod common;
pub mod ledger;
pub mod ledger_ext; // Extension methods for entity::hour_ledgers
pub mod payments;
pub mod transaction_ext; // Extension methods for entity::transactions
