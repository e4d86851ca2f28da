pub mod prelude;

pub mod approval_requests;
pub mod budget_policies;
pub mod consumption_records;
pub mod guardian_links;
pub mod hour_ledgers;
pub mod ledger_credits;
pub mod pricing_plans;
pub mod sea_orm_active_enums;
pub mod transactions;
