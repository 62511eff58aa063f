//! Test app state builder for HTTP-level testing: a full `AppState` wired to
//! the in-memory mocks, with accessors for seeding and assertions.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        access_grant::AccessGrantUseCases, checkout::CheckoutUseCases,
        messaging::MessagingService, reconciliation::ReconciliationUseCases,
        sweeps::SweepUseCases,
    },
    infra::config::AppConfig,
    test_utils::{
        FakeGateway, InMemoryAuditLogRepo, InMemoryFailedMessageRepo, InMemoryPaymentRepo,
        InMemorySubscriptionRepo, InMemoryUserAccessRepo, RecordingMailSender,
    },
};

pub const TEST_WEBHOOK_HASH: &str = "test-webhook-hash";
pub const TEST_CRON_SECRET: &str = "test-cron-secret";

pub struct TestAppStateBuilder {
    payments: Arc<InMemoryPaymentRepo>,
    subscriptions: Arc<InMemorySubscriptionRepo>,
    users: Arc<InMemoryUserAccessRepo>,
    audit: Arc<InMemoryAuditLogRepo>,
    failed_messages: Arc<InMemoryFailedMessageRepo>,
    gateway: Arc<FakeGateway>,
    mail: RecordingMailSender,
    webhook_hash: Option<String>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            payments: Arc::new(InMemoryPaymentRepo::new()),
            subscriptions: Arc::new(InMemorySubscriptionRepo::new()),
            users: Arc::new(InMemoryUserAccessRepo::new()),
            audit: Arc::new(InMemoryAuditLogRepo::new()),
            failed_messages: Arc::new(InMemoryFailedMessageRepo::new()),
            gateway: Arc::new(FakeGateway::new()),
            mail: RecordingMailSender::succeeding(),
            webhook_hash: Some(TEST_WEBHOOK_HASH.to_string()),
        }
    }

    /// Simulate a deployment without FLW_WEBHOOK_HASH.
    pub fn without_webhook_hash(mut self) -> Self {
        self.webhook_hash = None;
        self
    }

    // Accessors hand out the shared mocks for seeding and assertions; they
    // stay valid after `build()`.

    pub fn payments(&self) -> Arc<InMemoryPaymentRepo> {
        self.payments.clone()
    }

    pub fn subscriptions(&self) -> Arc<InMemorySubscriptionRepo> {
        self.subscriptions.clone()
    }

    pub fn users(&self) -> Arc<InMemoryUserAccessRepo> {
        self.users.clone()
    }

    pub fn audit(&self) -> Arc<InMemoryAuditLogRepo> {
        self.audit.clone()
    }

    pub fn failed_messages(&self) -> Arc<InMemoryFailedMessageRepo> {
        self.failed_messages.clone()
    }

    pub fn gateway(&self) -> Arc<FakeGateway> {
        self.gateway.clone()
    }

    pub fn mail(&self) -> RecordingMailSender {
        self.mail.clone()
    }

    pub fn build(self) -> AppState {
        let access_use_cases = Arc::new(AccessGrantUseCases::new(
            self.users.clone(),
            self.subscriptions.clone(),
        ));

        let checkout_use_cases = Arc::new(CheckoutUseCases::new(
            self.payments.clone(),
            self.gateway.clone(),
            "http://localhost:3000/billing/callback".to_string(),
            Some("card,banktransfer".to_string()),
        ));

        let reconciliation_use_cases = Arc::new(ReconciliationUseCases::new(
            self.payments.clone(),
            self.audit.clone(),
            self.gateway.clone(),
            access_use_cases.clone(),
            self.webhook_hash
                .map(|hash| SecretString::new(hash.into())),
        ));

        let messaging = Arc::new(MessagingService::new(
            Arc::new(self.mail.clone()),
            self.failed_messages.clone(),
        ));

        let sweep_use_cases = Arc::new(SweepUseCases::new(
            self.users.clone(),
            self.subscriptions.clone(),
            self.payments.clone(),
            messaging,
            reconciliation_use_cases.clone(),
        ));

        let config = Arc::new(AppConfig {
            database_url: String::new(),
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            app_origin: Url::parse("http://localhost:3000").unwrap(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            flw_secret_key: SecretString::new("test_flw_secret".into()),
            flw_base_url: "https://api.flutterwave.test/v3".to_string(),
            flw_webhook_hash: None,
            payment_options: Some("card,banktransfer".to_string()),
            mailtrap_api_key: None,
            mail_from: "billing@test.local".to_string(),
            cron_secret: SecretString::new(TEST_CRON_SECRET.into()),
        });

        AppState {
            config,
            checkout_use_cases,
            reconciliation_use_cases,
            access_use_cases,
            sweep_use_cases,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
