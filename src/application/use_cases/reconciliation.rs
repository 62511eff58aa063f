//! Webhook Reconciler: authenticates gateway notifications, re-verifies each
//! transaction server-side, and drives the payment state machine.
//!
//! Notifications arrive at-least-once, possibly reordered, possibly before
//! the local `initiated` row is visible. All correctness comes from guarded,
//! idempotent transitions keyed by tx_ref; nothing here assumes delivery
//! order.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        PaymentGatewayPort, SettlementStatus, settlement_from_gateway_status,
    },
    application::use_cases::{
        access_grant::{AccessGrantUseCases, PREMIUM_DAYS},
        ledger::{AuditLogRepo, CreatePaymentInput, PaymentRepo},
    },
    domain::entities::payment::{Payment, PaymentStatus},
};

/// Outcome of processing one notification. Routes map these onto the short
/// status tokens the gateway sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Verified successful; this call settled the Payment and granted access.
    Granted,
    /// Verified failed/cancelled; this call recorded the failure.
    MarkedFailed,
    /// The Payment was already terminal. Acknowledged with no side effects.
    AlreadySettled,
    /// Verification reports a transitional status; a later notification or a
    /// sweep will resolve it.
    Pending,
    /// Malformed noise (no tx_ref, or no resolvable owner). Acknowledged.
    Ignored,
    /// Verified amount/currency disagrees with the stored Payment. The row
    /// is left open for inspection and a future retry.
    Mismatch,
}

impl ReconcileOutcome {
    pub fn token(&self) -> &'static str {
        match self {
            ReconcileOutcome::Granted | ReconcileOutcome::MarkedFailed => "ok",
            ReconcileOutcome::AlreadySettled => "already-processed",
            ReconcileOutcome::Pending => "pending",
            ReconcileOutcome::Ignored => "ignored",
            ReconcileOutcome::Mismatch => "mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Payment found; advisory `callback_received` recorded (or it was
    /// already past that point, which is equally fine).
    Received,
    /// No tx_ref, or no matching Payment.
    Ignored,
}

pub struct ReconciliationUseCases {
    payments: Arc<dyn PaymentRepo>,
    audit: Arc<dyn AuditLogRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
    access: Arc<AccessGrantUseCases>,
    /// Pre-shared webhook signature. None means the deployment is
    /// misconfigured and every notification is refused (fail closed).
    webhook_hash: Option<SecretString>,
}

impl ReconciliationUseCases {
    pub fn new(
        payments: Arc<dyn PaymentRepo>,
        audit: Arc<dyn AuditLogRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
        access: Arc<AccessGrantUseCases>,
        webhook_hash: Option<SecretString>,
    ) -> Self {
        Self {
            payments,
            audit,
            gateway,
            access,
            webhook_hash,
        }
    }

    /// Process one inbound push notification end to end.
    pub async fn process_webhook(
        &self,
        signature: Option<&str>,
        payload: &serde_json::Value,
    ) -> AppResult<ReconcileOutcome> {
        // Authentication precedes everything, the audit log included: an
        // unauthenticated request writes nothing.
        self.authenticate(signature)?;

        let data = &payload["data"];
        let tx_ref = data["tx_ref"]
            .as_str()
            .or_else(|| data["txRef"].as_str())
            .map(str::to_owned);

        self.audit
            .record_webhook(tx_ref.as_deref(), payload["event"].as_str(), payload)
            .await?;

        let Some(tx_ref) = tx_ref else {
            debug!("Webhook without tx_ref, acknowledging and ignoring");
            return Ok(ReconcileOutcome::Ignored);
        };

        let payment = match self.payments.get_by_tx_ref(&tx_ref).await? {
            Some(payment) => payment,
            // The webhook can outrun the initiation commit. Keep the event:
            // build a provisional row from the notification's own metadata.
            None => match self.create_provisional(&tx_ref, data).await? {
                Some(payment) => payment,
                None => return Ok(ReconcileOutcome::Ignored),
            },
        };

        // Fast path: the pushed status is only a hint, but when it implies
        // the terminal state we already hold, the redelivery needs no
        // verification round-trip and no side effects.
        if let Some(hint) = data["status"].as_str() {
            let implied = match settlement_from_gateway_status(hint) {
                SettlementStatus::Successful => Some(PaymentStatus::Successful),
                SettlementStatus::Failed => Some(PaymentStatus::Failed),
                SettlementStatus::Pending => None,
            };
            if implied.is_some_and(|s| s == payment.status) {
                debug!(tx_ref = %tx_ref, status = %payment.status, "Duplicate settlement notification");
                return Ok(ReconcileOutcome::AlreadySettled);
            }
        }

        self.reconcile(&payment).await
    }

    /// Re-verify one Payment against the gateway and apply the resulting
    /// transition. Shared by the webhook path and the stuck-payment sweep.
    pub async fn reconcile(&self, payment: &Payment) -> AppResult<ReconcileOutcome> {
        // The push payload is never trusted for the success decision.
        let verification = self.gateway.verify_by_reference(&payment.tx_ref).await?;

        match verification.status {
            SettlementStatus::Successful => {
                if verification.currency != payment.currency
                    || verification.amount_cents != payment.amount_cents
                {
                    warn!(
                        tx_ref = %payment.tx_ref,
                        expected_amount = payment.amount_cents,
                        verified_amount = verification.amount_cents,
                        expected_currency = %payment.currency,
                        verified_currency = %verification.currency,
                        "Verified amount/currency mismatch, leaving payment open"
                    );
                    return Ok(ReconcileOutcome::Mismatch);
                }

                let settled = self
                    .payments
                    .settle(
                        &payment.tx_ref,
                        verification.gateway_tx_id.as_deref(),
                        &verification.snapshot,
                    )
                    .await?;
                if !settled {
                    return Ok(ReconcileOutcome::AlreadySettled);
                }

                let grant = match &verification.plan_code {
                    Some(plan_code) => self
                        .access
                        .ensure_subscription(
                            payment.user_id,
                            plan_code,
                            &payment.currency,
                            &payment.tx_ref,
                            PREMIUM_DAYS,
                        )
                        .await
                        .map(|_| ()),
                    None => self
                        .access
                        .extend_premium(payment.user_id, PREMIUM_DAYS)
                        .await
                        .map(|_| ()),
                };

                if let Err(e) = grant {
                    error!(
                        error = %e,
                        tx_ref = %payment.tx_ref,
                        user_id = %payment.user_id,
                        "CRITICAL: payment settled but access grant failed - user may lack access"
                    );
                    return Err(e);
                }

                info!(
                    tx_ref = %payment.tx_ref,
                    user_id = %payment.user_id,
                    plan = ?verification.plan_code,
                    "Settled payment and granted access"
                );
                Ok(ReconcileOutcome::Granted)
            }
            SettlementStatus::Failed => {
                let reason = verification.failure_reason.as_deref().unwrap_or("failed");
                let transitioned = self.payments.mark_failed(&payment.tx_ref, reason).await?;
                if transitioned {
                    info!(tx_ref = %payment.tx_ref, reason, "Marked payment failed");
                    Ok(ReconcileOutcome::MarkedFailed)
                } else {
                    Ok(ReconcileOutcome::AlreadySettled)
                }
            }
            SettlementStatus::Pending => {
                debug!(tx_ref = %payment.tx_ref, "Transaction still pending at gateway");
                Ok(ReconcileOutcome::Pending)
            }
        }
    }

    /// Browser-redirect callback: append-only log plus the advisory
    /// `callback_received` mark. Never authoritative, never grants access.
    pub async fn process_callback(
        &self,
        tx_ref: Option<&str>,
        raw_query: &str,
    ) -> AppResult<CallbackOutcome> {
        let Some(tx_ref) = tx_ref else {
            debug!("Callback without tx_ref");
            return Ok(CallbackOutcome::Ignored);
        };

        self.audit.record_callback(tx_ref, raw_query).await?;

        match self.payments.get_by_tx_ref(tx_ref).await? {
            Some(_) => {
                let marked = self.payments.mark_callback_received(tx_ref).await?;
                if !marked {
                    debug!(tx_ref, "Callback after settlement, keeping state");
                }
                Ok(CallbackOutcome::Received)
            }
            None => {
                debug!(tx_ref, "Callback for unknown payment");
                Ok(CallbackOutcome::Ignored)
            }
        }
    }

    fn authenticate(&self, signature: Option<&str>) -> AppResult<()> {
        let Some(expected) = &self.webhook_hash else {
            error!("Webhook hash not configured; refusing notification");
            return Err(AppError::ProviderNotConfigured);
        };
        match signature {
            Some(sig) if sig.as_bytes() == expected.expose_secret().as_bytes() => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }

    async fn create_provisional(
        &self,
        tx_ref: &str,
        data: &serde_json::Value,
    ) -> AppResult<Option<Payment>> {
        let user_id = data["meta"]["user_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok());
        let amount_cents = json_amount_to_cents(&data["amount"]);
        let currency = data["currency"].as_str();

        let (Some(user_id), Some(amount_cents), Some(currency)) =
            (user_id, amount_cents, currency)
        else {
            warn!(
                tx_ref,
                "Notification for unknown tx_ref without usable metadata, ignoring"
            );
            return Ok(None);
        };

        info!(tx_ref, user_id = %user_id, "Creating provisional payment for early webhook");
        match self
            .payments
            .create(&CreatePaymentInput {
                user_id,
                tx_ref: tx_ref.to_string(),
                amount_cents,
                currency: currency.to_string(),
            })
            .await
        {
            Ok(payment) => Ok(Some(payment)),
            // The initiation commit became visible mid-flight; continue
            // against the row that won.
            Err(AppError::Conflict(_)) => self.payments.get_by_tx_ref(tx_ref).await,
            Err(e) => Err(e),
        }
    }
}

/// Gateway amounts arrive in major units, as a number or a numeric string.
fn json_amount_to_cents(value: &serde_json::Value) -> Option<i64> {
    let major = value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse::<f64>().ok()))?;
    Some((major * 100.0).round() as i64)
}
