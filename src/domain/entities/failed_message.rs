use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A transactional message that could not be delivered synchronously.
/// Deleted on successful redelivery; retry_count/last_error updated on each
/// failed attempt.
#[derive(Debug, Clone, Serialize)]
pub struct FailedMessageRecord {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub category: String,
    pub last_error: Option<String>,
    pub retry_count: i32,
    pub last_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
