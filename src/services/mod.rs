// Service modules
pub mod approval_service;
pub mod budget_service;
pub mod ledger_service;
pub mod payment_service;
pub mod relationships;

pub use approval_service::ApprovalService;
pub use budget_service::BudgetService;
pub use ledger_service::LedgerService;
pub use payment_service::{HttpPaymentGateway, PaymentGateway, PaymentService};
pub use relationships::RelationshipDirectory;
