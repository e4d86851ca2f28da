use serde::{Deserialize, Serialize};
use validator::Validate;

/// Gateway confirmation callback, keyed by the opaque reference the
/// gateway returned at initiation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmedRequest {
    #[validate(length(min = 1, max = 255))]
    pub gateway_reference: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailedRequest {
    #[validate(length(min = 1, max = 255))]
    pub gateway_reference: String,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackResponse {
    pub transaction: entity::transactions::Model,
}
