//! Externally triggered maintenance sweeps. No background scheduler runs in
//! this process; an outside cron hits the sweep endpoints, which makes every
//! pass observable and retryable.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    app_error::AppResult,
    application::ports::mailer::OutboundMessage,
    application::use_cases::{
        ledger::{PaymentRepo, SubscriptionRepo, UserAccessRepo},
        messaging::{MessagingService, RetrySummary},
        reconciliation::{ReconcileOutcome, ReconciliationUseCases},
    },
};

/// How far ahead the expiry sweep looks for subscriptions worth a renewal
/// reminder.
pub const RENEWAL_LOOKAHEAD_DAYS: i64 = 3;
/// A payment still unsettled this long after initiation is considered stuck
/// and re-verified against the gateway.
pub const STUCK_PAYMENT_AGE_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ExpirySweepSummary {
    pub downgraded: u64,
    pub reminders_sent: u64,
    pub reminders_failed: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReconcileSweepSummary {
    pub examined: u64,
    pub settled: u64,
    pub failed: u64,
    pub still_pending: u64,
}

pub struct SweepUseCases {
    users: Arc<dyn UserAccessRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
    payments: Arc<dyn PaymentRepo>,
    messaging: Arc<MessagingService>,
    reconciliation: Arc<ReconciliationUseCases>,
}

impl SweepUseCases {
    pub fn new(
        users: Arc<dyn UserAccessRepo>,
        subscriptions: Arc<dyn SubscriptionRepo>,
        payments: Arc<dyn PaymentRepo>,
        messaging: Arc<MessagingService>,
        reconciliation: Arc<ReconciliationUseCases>,
    ) -> Self {
        Self {
            users,
            subscriptions,
            payments,
            messaging,
            reconciliation,
        }
    }

    /// Downgrade lapsed premium users, then remind holders of subscriptions
    /// ending within the lookahead window. At most one reminder per user per
    /// UTC day, and a reminder is only recorded as sent when delivery
    /// actually succeeded.
    pub async fn run_expiry_sweep(&self) -> AppResult<ExpirySweepSummary> {
        let now = Utc::now();
        let mut summary = ExpirySweepSummary {
            downgraded: self.users.clear_expired_premium(now).await?,
            ..Default::default()
        };

        let cutoff = now + Duration::days(RENEWAL_LOOKAHEAD_DAYS);
        let ending = self
            .subscriptions
            .list_active_ending_before(cutoff, now)
            .await?;

        for subscription in ending {
            let Some(user) = self.users.get(subscription.user_id).await? else {
                warn!(
                    user_id = %subscription.user_id,
                    subscription_id = %subscription.id,
                    "Subscription without a user row, skipping reminder"
                );
                continue;
            };
            if user.reminder_sent_today(now) {
                continue;
            }

            let days_left = (subscription.current_period_end - now).num_days().max(0);
            let message = OutboundMessage::transactional(
                &user.email,
                "Your subscription is about to renew",
                &format!(
                    "Hi,\n\nYour {} subscription renews in {} day(s), on {}.\n\n\
                     No action is needed if you wish to continue.\n",
                    subscription.plan_code,
                    days_left,
                    subscription.current_period_end.format("%Y-%m-%d"),
                ),
            );

            if self.messaging.send_or_queue(&message).await? {
                self.users.mark_reminder_sent(user.user_id, now).await?;
                summary.reminders_sent += 1;
            } else {
                // Left unmarked so tomorrow's sweep (or the retry queue)
                // gets another chance.
                summary.reminders_failed += 1;
            }
        }

        info!(
            downgraded = summary.downgraded,
            reminders_sent = summary.reminders_sent,
            reminders_failed = summary.reminders_failed,
            "Expiry sweep complete"
        );
        Ok(summary)
    }

    /// Redeliver queued messages, oldest first.
    pub async fn run_message_retry(&self, limit: i64) -> AppResult<RetrySummary> {
        let summary = self.messaging.retry_failed(limit).await?;
        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            "Message retry sweep complete"
        );
        Ok(summary)
    }

    /// Re-verify payments stuck in a non-terminal state, covering webhook
    /// deliveries that never arrived. One gateway outage mid-sweep aborts
    /// the pass; the remaining rows are still unsettled next time.
    pub async fn run_reconcile_sweep(&self, limit: i64) -> AppResult<ReconcileSweepSummary> {
        let older_than = Utc::now() - Duration::minutes(STUCK_PAYMENT_AGE_MINUTES);
        let stuck = self.payments.list_unsettled(older_than, limit).await?;

        let mut summary = ReconcileSweepSummary::default();
        for payment in stuck {
            summary.examined += 1;
            match self.reconciliation.reconcile(&payment).await? {
                ReconcileOutcome::Granted => summary.settled += 1,
                ReconcileOutcome::MarkedFailed => summary.failed += 1,
                ReconcileOutcome::AlreadySettled => summary.settled += 1,
                ReconcileOutcome::Pending | ReconcileOutcome::Mismatch => {
                    summary.still_pending += 1
                }
                ReconcileOutcome::Ignored => {}
            }
        }

        info!(
            examined = summary.examined,
            settled = summary.settled,
            failed = summary.failed,
            still_pending = summary.still_pending,
            "Reconcile sweep complete"
        );
        Ok(summary)
    }
}
