use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one payment attempt.
///
/// `Successful` and `Failed` are terminal. The only move defined out of a
/// terminal state is the idempotent re-observation of the same state, which
/// is a no-op, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Initiated,
    CallbackReceived,
    Successful,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::CallbackReceived => "callback_received",
            PaymentStatus::Successful => "successful",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Successful | PaymentStatus::Failed)
    }

    /// Whether a write moving `self` to `next` is allowed.
    ///
    /// Graph: initiated -> callback_received -> {successful, failed}, with
    /// the direct initiated -> {successful, failed} edges also permitted
    /// (the webhook can land before any browser callback). Re-observing the
    /// current terminal state is allowed as a no-op.
    pub fn can_transition(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (self, next) {
            (Initiated, CallbackReceived) => true,
            (Initiated, Successful) | (Initiated, Failed) => true,
            (CallbackReceived, Successful) | (CallbackReceived, Failed) => true,
            (Successful, Successful) | (Failed, Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(PaymentStatus::Initiated),
            "callback_received" => Ok(PaymentStatus::CallbackReceived),
            "successful" => Ok(PaymentStatus::Successful),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// One attempted transaction. `tx_ref` is globally unique and immutable; it
/// is the idempotency key for all reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tx_ref: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub gateway_tx_id: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    /// Compact snapshot of the gateway's verification response, kept for
    /// forensic replay.
    pub verification_snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
