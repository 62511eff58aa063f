use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Append-only record of one inbound gateway push. Never mutated and never
/// authoritative for state; kept only for forensic replay.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookLogEntry {
    pub id: Uuid,
    pub tx_ref: Option<String>,
    pub event: Option<String>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one browser-redirect callback.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackLogEntry {
    pub id: Uuid,
    pub tx_ref: String,
    pub raw_query: String,
    pub created_at: DateTime<Utc>,
}
