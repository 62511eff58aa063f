use async_trait::async_trait;

use crate::app_error::AppResult;

#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub category: String,
}

impl OutboundMessage {
    pub fn transactional(recipient: &str, subject: &str, body: &str) -> Self {
        Self {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            category: "transactional".to_string(),
        }
    }
}

/// Outbound adapter for the mail provider. One delivery attempt per call;
/// retrying is the queue's job, never this port's.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> AppResult<()>;
}
