//! Mailtrap transactional send API client implementing the mail port.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::mailer::{MailSender, OutboundMessage},
    infra::http_client::build_client,
};

const MAILTRAP_SEND_URL: &str = "https://send.api.mailtrap.io/api/send";

pub struct MailtrapSender {
    client: Client,
    api_key: SecretString,
    from_email: String,
}

impl MailtrapSender {
    pub fn new(api_key: SecretString, from_email: String) -> Self {
        Self {
            client: build_client(),
            api_key,
            from_email,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendBody<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    text: &'a str,
    category: &'a str,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[async_trait]
impl MailSender for MailtrapSender {
    async fn send(&self, message: &OutboundMessage) -> AppResult<()> {
        let body = SendBody {
            from: Address {
                email: &self.from_email,
            },
            to: vec![Address {
                email: &message.recipient,
            }],
            subject: &message.subject,
            text: &message.body,
            category: &message.category,
        };

        let response = self
            .client
            .post(MAILTRAP_SEND_URL)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mailtrap request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Mailtrap rejected message ({status}): {detail}"
            )));
        }
        Ok(())
    }
}

/// Sink used when no mail credential is configured. Every send fails as
/// `ProviderNotConfigured`, which lands messages in the durable retry queue
/// instead of losing them.
pub struct UnconfiguredMailSender;

#[async_trait]
impl MailSender for UnconfiguredMailSender {
    async fn send(&self, message: &OutboundMessage) -> AppResult<()> {
        tracing::warn!(
            recipient = %message.recipient,
            subject = %message.subject,
            "MAILTRAP_API_KEY not set; message queued instead of sent"
        );
        Err(AppError::ProviderNotConfigured)
    }
}
