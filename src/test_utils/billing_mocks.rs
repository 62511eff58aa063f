//! In-memory doubles for the ledger repositories and outbound ports. Each
//! mirrors the Postgres adapter's guard semantics so use-case tests exercise
//! the same conditional-transition behavior the real store enforces.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        mailer::{MailSender, OutboundMessage},
        payment_gateway::{
            CreateSessionRequest, GatewayVerification, PaymentGatewayPort, SessionLink,
            SettlementStatus,
        },
    },
    application::use_cases::ledger::{
        AuditLogRepo, CreatePaymentInput, CreateSubscriptionInput, FailedMessageRepo, PaymentRepo,
        SubscriptionRepo, UserAccessRepo,
    },
    domain::entities::{
        audit::{CallbackLogEntry, WebhookLogEntry},
        failed_message::FailedMessageRecord,
        payment::{Payment, PaymentStatus},
        subscription::{Subscription, SubscriptionStatus},
        user_access::{self, UserAccess},
    },
};

// ----------------------------------------------------------------------
// Payments
// ----------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryPaymentRepo {
    by_tx_ref: Mutex<HashMap<String, Payment>>,
    /// Force the next N `create` calls to report a duplicate tx_ref.
    forced_conflicts: AtomicU32,
}

impl InMemoryPaymentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_tx_ref.lock().unwrap().len()
    }

    pub fn get_snapshot_by_tx_ref(&self, tx_ref: &str) -> Option<Payment> {
        self.by_tx_ref.lock().unwrap().get(tx_ref).cloned()
    }

    pub fn conflict_next_creates(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// Rewrite `created_at`, for aging rows past sweep thresholds.
    pub fn backdate_created_at(&self, tx_ref: &str, created_at: DateTime<Utc>) {
        if let Some(payment) = self.by_tx_ref.lock().unwrap().get_mut(tx_ref) {
            payment.created_at = created_at;
        }
    }

    fn transition(
        &self,
        tx_ref: &str,
        next: PaymentStatus,
        mutate: impl FnOnce(&mut Payment),
    ) -> bool {
        let mut store = self.by_tx_ref.lock().unwrap();
        let Some(payment) = store.get_mut(tx_ref) else {
            return false;
        };
        if payment.status == next || !payment.status.can_transition(next) {
            return false;
        }
        payment.status = next;
        payment.updated_at = Utc::now();
        mutate(payment);
        true
    }
}

#[async_trait]
impl PaymentRepo for InMemoryPaymentRepo {
    async fn create(&self, input: &CreatePaymentInput) -> AppResult<Payment> {
        if self
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::Conflict(format!(
                "payment with tx_ref {} already exists",
                input.tx_ref
            )));
        }

        let mut store = self.by_tx_ref.lock().unwrap();
        if store.contains_key(&input.tx_ref) {
            return Err(AppError::Conflict(format!(
                "payment with tx_ref {} already exists",
                input.tx_ref
            )));
        }
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            tx_ref: input.tx_ref.clone(),
            amount_cents: input.amount_cents,
            currency: input.currency.clone(),
            status: PaymentStatus::Initiated,
            gateway_tx_id: None,
            verified_at: None,
            failure_reason: None,
            verification_snapshot: None,
            created_at: now,
            updated_at: now,
        };
        store.insert(input.tx_ref.clone(), payment.clone());
        Ok(payment)
    }

    async fn get_by_tx_ref(&self, tx_ref: &str) -> AppResult<Option<Payment>> {
        Ok(self.by_tx_ref.lock().unwrap().get(tx_ref).cloned())
    }

    async fn mark_callback_received(&self, tx_ref: &str) -> AppResult<bool> {
        Ok(self.transition(tx_ref, PaymentStatus::CallbackReceived, |_| {}))
    }

    async fn settle(
        &self,
        tx_ref: &str,
        gateway_tx_id: Option<&str>,
        snapshot: &serde_json::Value,
    ) -> AppResult<bool> {
        Ok(self.transition(tx_ref, PaymentStatus::Successful, |payment| {
            payment.gateway_tx_id = gateway_tx_id.map(str::to_owned);
            payment.verified_at = Some(Utc::now());
            payment.verification_snapshot = Some(snapshot.clone());
        }))
    }

    async fn mark_failed(&self, tx_ref: &str, reason: &str) -> AppResult<bool> {
        Ok(self.transition(tx_ref, PaymentStatus::Failed, |payment| {
            payment.failure_reason = Some(reason.to_string());
        }))
    }

    async fn list_unsettled(
        &self,
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Payment>> {
        let store = self.by_tx_ref.lock().unwrap();
        let mut stuck: Vec<Payment> = store
            .values()
            .filter(|p| !p.status.is_terminal() && p.created_at < older_than)
            .cloned()
            .collect();
        stuck.sort_by_key(|p| p.created_at);
        stuck.truncate(limit as usize);
        Ok(stuck)
    }
}

// ----------------------------------------------------------------------
// Subscriptions
// ----------------------------------------------------------------------

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    by_id: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_for_user(&self, user_id: Uuid) -> Vec<Subscription> {
        let store = self.by_id.lock().unwrap();
        let mut subs: Vec<Subscription> = store
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.created_at);
        subs
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_current(
        &self,
        user_id: Uuid,
        plan_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Subscription>> {
        let store = self.by_id.lock().unwrap();
        Ok(store
            .values()
            .find(|s| s.user_id == user_id && s.plan_code == plan_code && s.is_current(now))
            .cloned())
    }

    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription> {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            plan_code: input.plan_code.clone(),
            currency: input.currency.clone(),
            status: SubscriptionStatus::Active,
            current_period_start: input.period_start,
            current_period_end: input.period_end,
            last_tx_ref: Some(input.tx_ref.clone()),
            created_at: now,
            updated_at: now,
        };
        self.by_id
            .lock()
            .unwrap()
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn extend_period(&self, id: Uuid, days: i64, tx_ref: &str) -> AppResult<bool> {
        let mut store = self.by_id.lock().unwrap();
        let Some(subscription) = store.get_mut(&id) else {
            return Ok(false);
        };
        if subscription.status != SubscriptionStatus::Active {
            return Ok(false);
        }
        subscription.current_period_end += chrono::Duration::days(days);
        subscription.last_tx_ref = Some(tx_ref.to_string());
        subscription.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_active_ending_before(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Subscription>> {
        let store = self.by_id.lock().unwrap();
        let mut ending: Vec<Subscription> = store
            .values()
            .filter(|s| s.is_current(now) && s.current_period_end <= cutoff)
            .cloned()
            .collect();
        ending.sort_by_key(|s| s.current_period_end);
        Ok(ending)
    }
}

// ----------------------------------------------------------------------
// User access
// ----------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryUserAccessRepo {
    by_id: Mutex<HashMap<Uuid, UserAccess>>,
}

impl InMemoryUserAccessRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserAccess) {
        self.by_id.lock().unwrap().insert(user.user_id, user);
    }

    pub fn get_snapshot(&self, user_id: Uuid) -> Option<UserAccess> {
        self.by_id.lock().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl UserAccessRepo for InMemoryUserAccessRepo {
    async fn get(&self, user_id: Uuid) -> AppResult<Option<UserAccess>> {
        Ok(self.by_id.lock().unwrap().get(&user_id).cloned())
    }

    async fn extend_premium(&self, user_id: Uuid, days: i64) -> AppResult<UserAccess> {
        let mut store = self.by_id.lock().unwrap();
        let user = store.get_mut(&user_id).ok_or(AppError::NotFound)?;
        let now = Utc::now();
        user.is_premium = true;
        user.premium_expires_at = Some(user_access::extended_expiry(
            user.premium_expires_at,
            now,
            days,
        ));
        Ok(user.clone())
    }

    async fn clear_expired_premium(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut store = self.by_id.lock().unwrap();
        let mut downgraded = 0;
        for user in store.values_mut() {
            if user.is_premium && user.premium_expires_at.is_some_and(|exp| exp <= now) {
                user.is_premium = false;
                downgraded += 1;
            }
        }
        Ok(downgraded)
    }

    async fn mark_reminder_sent(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut store = self.by_id.lock().unwrap();
        let user = store.get_mut(&user_id).ok_or(AppError::NotFound)?;
        user.last_renewal_reminder_sent_at = Some(now);
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Audit log
// ----------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryAuditLogRepo {
    webhooks: Mutex<Vec<WebhookLogEntry>>,
    callbacks: Mutex<Vec<CallbackLogEntry>>,
}

impl InMemoryAuditLogRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn webhook_count(&self) -> usize {
        self.webhooks.lock().unwrap().len()
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }

    pub fn webhook_snapshot(&self) -> Vec<WebhookLogEntry> {
        self.webhooks.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogRepo for InMemoryAuditLogRepo {
    async fn record_webhook(
        &self,
        tx_ref: Option<&str>,
        event: Option<&str>,
        payload: &serde_json::Value,
    ) -> AppResult<()> {
        self.webhooks.lock().unwrap().push(WebhookLogEntry {
            id: Uuid::new_v4(),
            tx_ref: tx_ref.map(str::to_owned),
            event: event.map(str::to_owned),
            payload: payload.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn record_callback(&self, tx_ref: &str, raw_query: &str) -> AppResult<()> {
        self.callbacks.lock().unwrap().push(CallbackLogEntry {
            id: Uuid::new_v4(),
            tx_ref: tx_ref.to_string(),
            raw_query: raw_query.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Failed-message queue
// ----------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryFailedMessageRepo {
    by_id: Mutex<HashMap<Uuid, FailedMessageRecord>>,
}

impl InMemoryFailedMessageRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> Vec<FailedMessageRecord> {
        let store = self.by_id.lock().unwrap();
        let mut records: Vec<FailedMessageRecord> = store.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

#[async_trait]
impl FailedMessageRepo for InMemoryFailedMessageRepo {
    async fn enqueue(
        &self,
        message: &OutboundMessage,
        error: &str,
    ) -> AppResult<FailedMessageRecord> {
        let now = Utc::now();
        let record = FailedMessageRecord {
            id: Uuid::new_v4(),
            recipient: message.recipient.clone(),
            subject: message.subject.clone(),
            body: message.body.clone(),
            category: message.category.clone(),
            last_error: Some(error.to_string()),
            retry_count: 0,
            last_attempt_at: now,
            created_at: now,
        };
        self.by_id.lock().unwrap().insert(record.id, record.clone());
        Ok(record)
    }

    async fn oldest(&self, limit: i64) -> AppResult<Vec<FailedMessageRecord>> {
        let mut records = self.snapshot();
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.by_id.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn record_attempt(&self, id: Uuid, error: &str) -> AppResult<()> {
        let mut store = self.by_id.lock().unwrap();
        if let Some(record) = store.get_mut(&id) {
            record.retry_count += 1;
            record.last_error = Some(error.to_string());
            record.last_attempt_at = Utc::now();
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Gateway
// ----------------------------------------------------------------------

enum VerifyBehavior {
    Respond(GatewayVerification),
    Fail,
}

/// Programmable gateway double. Defaults to a healthy session endpoint and
/// pending verification.
pub struct FakeGateway {
    fail_session: AtomicBool,
    verify: Mutex<VerifyBehavior>,
    verify_calls: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            fail_session: AtomicBool::new(false),
            verify: Mutex::new(VerifyBehavior::Respond(pending_verification())),
            verify_calls: AtomicU64::new(0),
        }
    }

    pub fn fail_session_creation(&self) {
        self.fail_session.store(true, Ordering::SeqCst);
    }

    pub fn set_verification(&self, verification: GatewayVerification) {
        *self.verify.lock().unwrap() = VerifyBehavior::Respond(verification);
    }

    pub fn set_failed_verification(&self, reason: &str) {
        self.set_verification(GatewayVerification {
            status: SettlementStatus::Failed,
            amount_cents: 0,
            currency: String::new(),
            gateway_tx_id: Some("9143867".to_string()),
            plan_code: None,
            failure_reason: Some(reason.to_string()),
            snapshot: json!({ "status": "failed", "processor_response": reason }),
        });
    }

    pub fn set_pending_verification(&self) {
        self.set_verification(pending_verification());
    }

    pub fn fail_verification(&self) {
        *self.verify.lock().unwrap() = VerifyBehavior::Fail;
    }

    pub fn verify_calls(&self) -> u64 {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn pending_verification() -> GatewayVerification {
    GatewayVerification {
        status: SettlementStatus::Pending,
        amount_cents: 0,
        currency: String::new(),
        gateway_tx_id: None,
        plan_code: None,
        failure_reason: None,
        snapshot: json!({ "status": "pending" }),
    }
}

#[async_trait]
impl PaymentGatewayPort for FakeGateway {
    async fn create_session(&self, req: &CreateSessionRequest) -> AppResult<SessionLink> {
        if self.fail_session.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("gateway unavailable".into()));
        }
        Ok(SessionLink {
            link: format!("https://checkout.gateway.test/pay/{}", req.tx_ref),
        })
    }

    async fn verify_by_reference(&self, _tx_ref: &str) -> AppResult<GatewayVerification> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.verify.lock().unwrap() {
            VerifyBehavior::Respond(verification) => Ok(verification.clone()),
            VerifyBehavior::Fail => Err(AppError::Upstream("gateway unavailable".into())),
        }
    }
}

// ----------------------------------------------------------------------
// Mail
// ----------------------------------------------------------------------

/// Records every delivered message; flips between succeeding and failing at
/// runtime. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingMailSender {
    inner: Arc<RecordingMailSenderInner>,
}

#[derive(Default)]
struct RecordingMailSenderInner {
    failing: AtomicBool,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingMailSender {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sender = Self::default();
        sender.set_failing(true);
        sender
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().unwrap().len()
    }

    pub fn sent_snapshot(&self) -> Vec<OutboundMessage> {
        self.inner.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, message: &OutboundMessage) -> AppResult<()> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("mail provider rejected request".into()));
        }
        self.inner.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
