use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::ledger::{CreateSubscriptionInput, SubscriptionRepo, UserAccessRepo},
    domain::entities::{subscription::Subscription, user_access::UserAccess},
};

/// Paid-access window granted per settled transaction.
pub const PREMIUM_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct AccessStatus {
    pub user_id: Uuid,
    pub access_active: bool,
    pub trial_active: bool,
    pub is_premium: bool,
    pub premium_expires_at: Option<DateTime<Utc>>,
}

/// Computes and persists premium/subscription windows for verified,
/// successful transactions. Callers are responsible for invoking the grant
/// operations at most once per settlement; the payment state machine is
/// that gate, not this service.
pub struct AccessGrantUseCases {
    users: Arc<dyn UserAccessRepo>,
    subscriptions: Arc<dyn SubscriptionRepo>,
}

impl AccessGrantUseCases {
    pub fn new(users: Arc<dyn UserAccessRepo>, subscriptions: Arc<dyn SubscriptionRepo>) -> Self {
        Self {
            users,
            subscriptions,
        }
    }

    /// Extend the user's simple premium window by `days` from whichever of
    /// (now, current expiry) is later.
    pub async fn extend_premium(&self, user_id: Uuid, days: i64) -> AppResult<UserAccess> {
        let user = self.users.extend_premium(user_id, days).await?;
        info!(
            user_id = %user_id,
            new_expiry = ?user.premium_expires_at,
            "Extended premium window"
        );
        Ok(user)
    }

    /// Extend the (user, plan) subscription if one is active and unelapsed,
    /// otherwise open a fresh one starting now. Always also extends the
    /// denormalized premium projection so the two never drift.
    pub async fn ensure_subscription(
        &self,
        user_id: Uuid,
        plan_code: &str,
        currency: &str,
        tx_ref: &str,
        days: i64,
    ) -> AppResult<Subscription> {
        let now = Utc::now();

        let subscription = match self.subscriptions.get_current(user_id, plan_code, now).await? {
            Some(current) => {
                let extended = self
                    .subscriptions
                    .extend_period(current.id, days, tx_ref)
                    .await?;
                if extended {
                    info!(
                        user_id = %user_id,
                        plan_code,
                        tx_ref,
                        "Extended subscription period"
                    );
                    self.subscriptions
                        .get_current(user_id, plan_code, now)
                        .await?
                        .ok_or_else(|| {
                            AppError::Internal("extended subscription disappeared".into())
                        })?
                } else {
                    // Lost a race against cancellation; open a fresh window.
                    self.create_subscription(user_id, plan_code, currency, tx_ref, now, days)
                        .await?
                }
            }
            None => {
                self.create_subscription(user_id, plan_code, currency, tx_ref, now, days)
                    .await?
            }
        };

        self.extend_premium(user_id, days).await?;
        Ok(subscription)
    }

    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan_code: &str,
        currency: &str,
        tx_ref: &str,
        now: DateTime<Utc>,
        days: i64,
    ) -> AppResult<Subscription> {
        let subscription = self
            .subscriptions
            .create(&CreateSubscriptionInput {
                user_id,
                plan_code: plan_code.to_string(),
                currency: currency.to_string(),
                tx_ref: tx_ref.to_string(),
                period_start: now,
                period_end: now + Duration::days(days),
            })
            .await?;
        info!(user_id = %user_id, plan_code, tx_ref, "Opened subscription");
        Ok(subscription)
    }

    /// Pure read model over the stored access fields and the current time.
    pub async fn access_status(&self, user_id: Uuid) -> AppResult<AccessStatus> {
        let user = self.users.get(user_id).await?.ok_or(AppError::NotFound)?;
        let now = Utc::now();
        Ok(AccessStatus {
            user_id,
            access_active: user.access_active(now),
            trial_active: user.trial_active(now),
            is_premium: user.is_premium,
            premium_expires_at: user.premium_expires_at,
        })
    }
}
