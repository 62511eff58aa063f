use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Free trial length, counted from `trial_start`.
pub const TRIAL_DAYS: i64 = 7;

/// Projection of subscription state onto the user row. The reconciliation
/// engine owns exactly these columns; the rest of the user record is other
/// plumbing's business.
#[derive(Debug, Clone, Serialize)]
pub struct UserAccess {
    pub user_id: Uuid,
    pub email: String,
    pub trial_start: Option<DateTime<Utc>>,
    pub is_premium: bool,
    /// None with `is_premium` set means unlimited access.
    pub premium_expires_at: Option<DateTime<Utc>>,
    pub last_renewal_reminder_sent_at: Option<DateTime<Utc>>,
}

impl UserAccess {
    pub fn premium_active(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.premium_expires_at.is_none_or(|exp| exp > now)
    }

    /// Trial window check. Premium presence suppresses the trial: a premium
    /// user is never reported as "on trial", even an expired-premium one.
    pub fn trial_active(&self, now: DateTime<Utc>) -> bool {
        if self.is_premium {
            return false;
        }
        self.trial_start
            .is_some_and(|start| now < start + Duration::days(TRIAL_DAYS))
    }

    /// Whether the user may use paid functionality right now.
    pub fn access_active(&self, now: DateTime<Utc>) -> bool {
        self.premium_active(now) || self.trial_active(now)
    }

    /// Whether a renewal reminder was already recorded on `now`'s UTC
    /// calendar day.
    pub fn reminder_sent_today(&self, now: DateTime<Utc>) -> bool {
        self.last_renewal_reminder_sent_at
            .is_some_and(|sent| sent.date_naive() == now.date_naive())
    }
}

/// New premium expiry after granting `days` more: extension always adds to
/// whichever of (now, current expiry) is later, so a renewal never shortens
/// remaining access.
///
/// Deliberately not idempotent - callers must invoke it at most once per
/// settled transaction; the payment state machine is that gate.
pub fn extended_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    days: i64,
) -> DateTime<Utc> {
    let base = match current {
        Some(exp) if exp > now => exp,
        _ => now,
    };
    base + Duration::days(days)
}
