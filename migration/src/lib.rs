pub use sea_orm_migration::prelude::*;

mod m20250612_000001_create_guardian_links;
mod m20250612_000002_create_pricing_plans;
mod m20250612_000003_create_transactions;
mod m20250612_000004_create_ledger_tables;
mod m20250613_000001_create_budget_policies;
mod m20250613_000002_create_approval_requests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250612_000001_create_guardian_links::Migration),
            Box::new(m20250612_000002_create_pricing_plans::Migration),
            Box::new(m20250612_000003_create_transactions::Migration),
            Box::new(m20250612_000004_create_ledger_tables::Migration),
            Box::new(m20250613_000001_create_budget_policies::Migration),
            Box::new(m20250613_000002_create_approval_requests::Migration),
        ]
    }
}
