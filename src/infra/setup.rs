use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    application::ports::mailer::MailSender,
    application::use_cases::{
        access_grant::AccessGrantUseCases,
        checkout::CheckoutUseCases,
        ledger::{AuditLogRepo, FailedMessageRepo, PaymentRepo, SubscriptionRepo, UserAccessRepo},
        messaging::MessagingService,
        reconciliation::ReconciliationUseCases,
        sweeps::SweepUseCases,
    },
    infra::{
        config::AppConfig,
        db::init_db,
        flutterwave_client::FlutterwaveClient,
        mailtrap_client::{MailtrapSender, UnconfiguredMailSender},
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let pool = init_db(&config.database_url).await?;
    let postgres_arc = Arc::new(PostgresPersistence::new(pool));

    let payment_repo = postgres_arc.clone() as Arc<dyn PaymentRepo>;
    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;
    let user_access_repo = postgres_arc.clone() as Arc<dyn UserAccessRepo>;
    let audit_repo = postgres_arc.clone() as Arc<dyn AuditLogRepo>;
    let failed_message_repo = postgres_arc.clone() as Arc<dyn FailedMessageRepo>;

    let gateway = Arc::new(FlutterwaveClient::new(
        config.flw_base_url.clone(),
        config.flw_secret_key.clone(),
    ));

    let mail_sender: Arc<dyn MailSender> = match &config.mailtrap_api_key {
        Some(api_key) => Arc::new(MailtrapSender::new(
            api_key.clone(),
            config.mail_from.clone(),
        )),
        None => Arc::new(UnconfiguredMailSender),
    };

    let messaging = Arc::new(MessagingService::new(mail_sender, failed_message_repo));

    let access_use_cases = Arc::new(AccessGrantUseCases::new(
        user_access_repo.clone(),
        subscription_repo.clone(),
    ));

    let checkout_use_cases = Arc::new(CheckoutUseCases::new(
        payment_repo.clone(),
        gateway.clone(),
        config.callback_url(),
        config.payment_options.clone(),
    ));

    let reconciliation_use_cases = Arc::new(ReconciliationUseCases::new(
        payment_repo.clone(),
        audit_repo,
        gateway,
        access_use_cases.clone(),
        config.flw_webhook_hash.clone(),
    ));

    let sweep_use_cases = Arc::new(SweepUseCases::new(
        user_access_repo,
        subscription_repo,
        payment_repo,
        messaging,
        reconciliation_use_cases.clone(),
    ));

    Ok(AppState {
        config: Arc::new(config),
        checkout_use_cases,
        reconciliation_use_cases,
        access_use_cases,
        sweep_use_cases,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "brandvoice_billing=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
