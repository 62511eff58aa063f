use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    app_error::AppResult,
    application::ports::mailer::{MailSender, OutboundMessage},
    application::use_cases::ledger::FailedMessageRepo,
};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RetrySummary {
    pub attempted: u64,
    pub delivered: u64,
}

/// Wraps the mail port with the durable retry queue: one synchronous
/// delivery attempt, and a FailedMessageRecord when that attempt fails.
pub struct MessagingService {
    sender: Arc<dyn MailSender>,
    failed: Arc<dyn FailedMessageRepo>,
}

impl MessagingService {
    pub fn new(sender: Arc<dyn MailSender>, failed: Arc<dyn FailedMessageRepo>) -> Self {
        Self { sender, failed }
    }

    /// Returns true only when delivery actually succeeded. A failed attempt
    /// lands in the retry queue and reports false.
    pub async fn send_or_queue(&self, message: &OutboundMessage) -> AppResult<bool> {
        match self.sender.send(message).await {
            Ok(()) => {
                info!(
                    recipient = %message.recipient,
                    subject = %message.subject,
                    "Delivered message"
                );
                Ok(true)
            }
            Err(e) => {
                warn!(
                    recipient = %message.recipient,
                    subject = %message.subject,
                    error = %e,
                    "Delivery failed, queuing for retry"
                );
                self.failed.enqueue(message, &e.to_string()).await?;
                Ok(false)
            }
        }
    }

    /// Redeliver the oldest `limit` queued messages. A record is deleted on
    /// success and updated in place (retry_count, last error) on failure.
    pub async fn retry_failed(&self, limit: i64) -> AppResult<RetrySummary> {
        let pending = self.failed.oldest(limit).await?;
        let mut summary = RetrySummary::default();

        for record in pending {
            summary.attempted += 1;
            let message = OutboundMessage {
                recipient: record.recipient.clone(),
                subject: record.subject.clone(),
                body: record.body.clone(),
                category: record.category.clone(),
            };
            match self.sender.send(&message).await {
                Ok(()) => {
                    self.failed.delete(record.id).await?;
                    summary.delivered += 1;
                    info!(
                        id = %record.id,
                        recipient = %record.recipient,
                        attempts = record.retry_count + 1,
                        "Redelivered queued message"
                    );
                }
                Err(e) => {
                    self.failed.record_attempt(record.id, &e.to_string()).await?;
                    warn!(
                        id = %record.id,
                        recipient = %record.recipient,
                        error = %e,
                        "Queued message still failing"
                    );
                }
            }
        }

        Ok(summary)
    }
}
