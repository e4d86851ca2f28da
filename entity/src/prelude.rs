pub use super::approval_requests::Entity as ApprovalRequests;
pub use super::budget_policies::Entity as BudgetPolicies;
pub use super::consumption_records::Entity as ConsumptionRecords;
pub use super::guardian_links::Entity as GuardianLinks;
pub use super::hour_ledgers::Entity as HourLedgers;
pub use super::ledger_credits::Entity as LedgerCredits;
pub use super::pricing_plans::Entity as PricingPlans;
pub use super::transactions::Entity as Transactions;
