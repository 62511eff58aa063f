use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Public origin of the frontend; the gateway redirects browsers back
    /// under this origin after checkout.
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub flw_secret_key: SecretString,
    pub flw_base_url: String,
    /// Pre-shared webhook signature. Deliberately optional: a deployment
    /// without it refuses every webhook instead of crashing at boot.
    pub flw_webhook_hash: Option<SecretString>,
    /// Payment-method hint forwarded to the hosted checkout page.
    pub payment_options: Option<String>,
    pub mailtrap_api_key: Option<SecretString>,
    pub mail_from: String,
    pub cron_secret: SecretString,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let flw_secret_key: SecretString =
            SecretString::new(get_env::<String>("FLW_SECRET_KEY").into());
        let flw_base_url: String = get_env_default(
            "FLW_BASE_URL",
            "https://api.flutterwave.com/v3".to_string(),
        );
        let flw_webhook_hash: Option<SecretString> = std::env::var("FLW_WEBHOOK_HASH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.into()));
        let payment_options: Option<String> = std::env::var("PAYMENT_OPTIONS")
            .ok()
            .filter(|s| !s.is_empty());

        let mailtrap_api_key: Option<SecretString> = std::env::var("MAILTRAP_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| SecretString::new(s.into()));
        let mail_from: String =
            get_env_default("MAIL_FROM", "billing@brandvoice.app".to_string());

        let cron_secret: SecretString = SecretString::new(get_env::<String>("CRON_SECRET").into());

        Self {
            database_url,
            bind_addr,
            app_origin,
            cors_origin,
            flw_secret_key,
            flw_base_url,
            flw_webhook_hash,
            payment_options,
            mailtrap_api_key,
            mail_from,
            cron_secret,
        }
    }

    /// The browser-return URL handed to the gateway at session creation.
    pub fn callback_url(&self) -> String {
        format!(
            "{}/billing/callback",
            self.app_origin.as_str().trim_end_matches('/')
        )
    }
}
