use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Insufficient balance: requested {requested} hours, {remaining} remaining")]
    InsufficientBalance {
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("Transaction {0} already credited to ledger")]
    AlreadyCredited(Uuid),

    #[error("Consumption record {0} already refunded")]
    AlreadyRefunded(Uuid),

    #[error("Approval request {0} expired before resolution")]
    AlreadyExpired(Uuid),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unauthorized approver: {0}")]
    UnauthorizedApprover(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            ApiError::InsufficientBalance { .. } => (
                StatusCode::CONFLICT,
                "INSUFFICIENT_BALANCE",
                self.to_string(),
            ),
            ApiError::AlreadyCredited(_) => {
                // Duplicate gateway confirmation reaching the ledger twice
                // indicates a caller bug; reject loudly, never re-credit.
                tracing::error!("Integrity violation: {}", self);
                (StatusCode::CONFLICT, "ALREADY_CREDITED", self.to_string())
            }
            ApiError::AlreadyRefunded(_) => {
                (StatusCode::CONFLICT, "ALREADY_REFUNDED", self.to_string())
            }
            ApiError::AlreadyExpired(_) => {
                (StatusCode::GONE, "APPROVAL_EXPIRED", self.to_string())
            }
            ApiError::InvalidState(ref msg) => {
                (StatusCode::CONFLICT, "INVALID_STATE", msg.clone())
            }
            ApiError::UnauthorizedApprover(ref msg) => {
                (StatusCode::FORBIDDEN, "UNAUTHORIZED_APPROVER", msg.clone())
            }
            ApiError::Gateway(ref msg) => {
                tracing::error!("Payment gateway error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "PAYMENT_GATEWAY_ERROR",
                    "Payment gateway temporarily unavailable".to_string(),
                )
            }
            ApiError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::NotFound(ref msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            ApiError::Conflict(ref msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            ApiError::Internal(ref e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

// Helper type for results
pub type Result<T> = std::result::Result<T, ApiError>;
