use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Everything the gateway needs to open a hosted payment session.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub tx_ref: String,
    pub amount_cents: i64,
    pub currency: String,
    pub redirect_url: String,
    pub customer_email: String,
    /// Payment-method hint, e.g. "card,banktransfer".
    pub payment_options: Option<String>,
    /// Gateway plan id for recurring billing.
    pub payment_plan: Option<String>,
    pub user_id: Uuid,
}

/// Hosted-checkout handle returned by session creation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionLink {
    pub link: String,
}

/// The gateway's authoritative settlement decision for a transaction.
///
/// The push payload is never trusted for this; only a direct verification
/// call produces one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStatus {
    Successful,
    Failed,
    /// Anything that is neither settled nor definitively failed. A later
    /// notification or a sweep resolves it.
    Pending,
}

/// Verified server-side state of one transaction.
#[derive(Debug, Clone)]
pub struct GatewayVerification {
    pub status: SettlementStatus,
    pub amount_cents: i64,
    pub currency: String,
    pub gateway_tx_id: Option<String>,
    /// Present when the transaction belongs to a recurring plan.
    pub plan_code: Option<String>,
    pub failure_reason: Option<String>,
    /// Compact subset of the raw response, persisted on the Payment.
    pub snapshot: serde_json::Value,
}

/// Outbound adapter for the payment gateway. Pure, stateless; every call
/// carries a bounded timeout and surfaces transport failures as
/// `AppError::Upstream`.
#[async_trait]
pub trait PaymentGatewayPort: Send + Sync {
    async fn create_session(&self, req: &CreateSessionRequest) -> AppResult<SessionLink>;

    /// Authoritative verification by reference. Must never be skipped in
    /// favor of a pushed status.
    async fn verify_by_reference(&self, tx_ref: &str) -> AppResult<GatewayVerification>;
}

/// Map a gateway status string to the tagged settlement variant.
pub fn settlement_from_gateway_status(status: &str) -> SettlementStatus {
    match status.to_ascii_lowercase().as_str() {
        "successful" => SettlementStatus::Successful,
        "failed" | "cancelled" => SettlementStatus::Failed,
        _ => SettlementStatus::Pending,
    }
}
