use crate::{
    config::Config,
    events::{EventSink, TracingEventSink},
    services::{
        ApprovalService, BudgetService, HttpPaymentGateway, LedgerService, PaymentGateway,
        PaymentService, RelationshipDirectory,
    },
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub ledger_service: Arc<LedgerService>,
    pub budget_service: Arc<BudgetService>,
    pub approval_service: Arc<ApprovalService>,
    pub payment_service: Arc<PaymentService>,
    pub events: Arc<dyn EventSink>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(&config.gateway));
        Ok(Self::build(db, config, gateway))
    }

    /// Wire services around an existing connection and gateway. Tests use
    /// this to swap in a stub gateway.
    pub fn build(
        db: DatabaseConnection,
        config: Config,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let ledger_service = Arc::new(LedgerService::new(db.clone()));
        let budget_service = Arc::new(BudgetService::new(db.clone(), &config.school));
        let relationships = Arc::new(RelationshipDirectory::new(db.clone()));
        let approval_service = Arc::new(ApprovalService::new(
            db.clone(),
            &config.approvals,
            budget_service.clone(),
            relationships.clone(),
        ));
        let payment_service = Arc::new(PaymentService::new(
            db.clone(),
            gateway,
            ledger_service.clone(),
        ));

        Self {
            db,
            ledger_service,
            budget_service,
            approval_service,
            payment_service,
            events: Arc::new(TracingEventSink),
            config: Arc::new(config),
        }
    }
}
