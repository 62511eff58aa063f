//! Repository traits for the durable ledger.
//!
//! Every mutation here is a single-row conditional operation: "check guard,
//! write new state" happens inside one storage call, and the `bool` returns
//! report whether the guard passed. Concurrent writers therefore never
//! interleave a read-then-write across calls, which is what the whole
//! reconciliation engine leans on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    application::ports::mailer::OutboundMessage,
    domain::entities::{
        failed_message::FailedMessageRecord, payment::Payment, subscription::Subscription,
        user_access::UserAccess,
    },
};

#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    pub user_id: Uuid,
    pub tx_ref: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct CreateSubscriptionInput {
    pub user_id: Uuid,
    pub plan_code: String,
    pub currency: String,
    pub tx_ref: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentRepo: Send + Sync {
    /// Insert a fresh `initiated` Payment. `AppError::Conflict` when the
    /// tx_ref already exists.
    async fn create(&self, input: &CreatePaymentInput) -> AppResult<Payment>;

    async fn get_by_tx_ref(&self, tx_ref: &str) -> AppResult<Option<Payment>>;

    /// Guarded `initiated -> callback_received`. Returns false (no-op) from
    /// any other state; a terminal state is never downgraded.
    async fn mark_callback_received(&self, tx_ref: &str) -> AppResult<bool>;

    /// Guarded transition to `successful`, persisting the gateway id,
    /// verification timestamp and snapshot. Returns whether this call won
    /// the transition; false means another writer already settled the row.
    async fn settle(
        &self,
        tx_ref: &str,
        gateway_tx_id: Option<&str>,
        snapshot: &serde_json::Value,
    ) -> AppResult<bool>;

    /// Guarded transition to `failed` with a reason. False when the row was
    /// already terminal.
    async fn mark_failed(&self, tx_ref: &str, reason: &str) -> AppResult<bool>;

    /// Non-terminal Payments created before `older_than`, oldest first.
    async fn list_unsettled(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Payment>>;
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    /// The active, unelapsed row for (user, plan), if any.
    async fn get_current(
        &self,
        user_id: Uuid,
        plan_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Subscription>>;

    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription>;

    /// Push `current_period_end` forward by `days` from its current value
    /// (not from now) and record the settling tx_ref. Guarded on `active`.
    async fn extend_period(&self, id: Uuid, days: i64, tx_ref: &str) -> AppResult<bool>;

    /// Active subscriptions whose period end falls in (now, cutoff].
    async fn list_active_ending_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>>;
}

#[async_trait]
pub trait UserAccessRepo: Send + Sync {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<UserAccess>>;

    /// Atomically set the premium flag and push the expiry to
    /// `max(now, current) + days`. `AppError::NotFound` for unknown users.
    async fn extend_premium(&self, user_id: Uuid, days: i64) -> AppResult<UserAccess>;

    /// Drop the premium flag on every user whose window has elapsed.
    /// Returns how many rows were downgraded.
    async fn clear_expired_premium(&self, now: DateTime<Utc>) -> AppResult<u64>;

    async fn mark_reminder_sent(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()>;
}

/// Append-only audit rows. Failures to write audit data are still errors;
/// the webhook path treats the log as part of its contract.
#[async_trait]
pub trait AuditLogRepo: Send + Sync {
    async fn record_webhook(
        &self,
        tx_ref: Option<&str>,
        event: Option<&str>,
        payload: &serde_json::Value,
    ) -> AppResult<()>;

    async fn record_callback(&self, tx_ref: &str, raw_query: &str) -> AppResult<()>;
}

#[async_trait]
pub trait FailedMessageRepo: Send + Sync {
    async fn enqueue(
        &self,
        message: &OutboundMessage,
        error: &str,
    ) -> AppResult<FailedMessageRecord>;

    /// Oldest records first, bounded by `limit`.
    async fn oldest(&self, limit: i64) -> AppResult<Vec<FailedMessageRecord>>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// retry_count++ plus the new error and attempt timestamp.
    async fn record_attempt(&self, id: Uuid, error: &str) -> AppResult<()>;
}
