//! Flutterwave v3 API client implementing the payment gateway port.
//!
//! Amounts cross this boundary in major units (the gateway's convention);
//! everything inside the crate stays in minor units.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{
        CreateSessionRequest, GatewayVerification, PaymentGatewayPort, SessionLink,
        settlement_from_gateway_status,
    },
    infra::http_client::build_client,
};

pub struct FlutterwaveClient {
    client: Client,
    base_url: String,
    secret_key: SecretString,
}

impl FlutterwaveClient {
    pub fn new(base_url: String, secret_key: SecretString) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.secret_key.expose_secret())
    }
}

#[derive(Debug, Serialize)]
struct PaymentSessionBody<'a> {
    tx_ref: &'a str,
    amount: f64,
    currency: &'a str,
    redirect_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_options: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_plan: Option<&'a str>,
    customer: CustomerBody<'a>,
    meta: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct CustomerBody<'a> {
    email: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SessionData {
    link: String,
}

#[derive(Debug, Deserialize)]
struct VerificationData {
    id: Option<serde_json::Value>,
    status: Option<String>,
    amount: Option<f64>,
    currency: Option<String>,
    payment_plan: Option<serde_json::Value>,
    processor_response: Option<String>,
}

fn upstream(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Upstream(format!("{context}: {err}"))
}

/// Gateway ids and plan ids show up as numbers or strings depending on the
/// endpoint; normalize to a string.
fn json_id_to_string(value: &Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl PaymentGatewayPort for FlutterwaveClient {
    async fn create_session(&self, req: &CreateSessionRequest) -> AppResult<SessionLink> {
        let body = PaymentSessionBody {
            tx_ref: &req.tx_ref,
            amount: req.amount_cents as f64 / 100.0,
            currency: &req.currency,
            redirect_url: &req.redirect_url,
            payment_options: req.payment_options.as_deref(),
            payment_plan: req.payment_plan.as_deref(),
            customer: CustomerBody {
                email: &req.customer_email,
            },
            // Echoed back in webhooks; lets a notification that outruns our
            // insert still be attributed to its owner.
            meta: json!({ "user_id": req.user_id }),
        };

        let response = self
            .client
            .post(format!("{}/payments", self.base_url))
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| upstream("Flutterwave session request failed", e))?;

        let status = response.status();
        let envelope: Envelope<SessionData> = response
            .json()
            .await
            .map_err(|e| upstream("Flutterwave session response unreadable", e))?;

        if !status.is_success() || envelope.status != "success" {
            return Err(AppError::Upstream(format!(
                "Flutterwave session creation rejected ({}): {}",
                status,
                envelope.message.unwrap_or_default()
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| AppError::Upstream("Flutterwave session response without data".into()))?;
        Ok(SessionLink { link: data.link })
    }

    async fn verify_by_reference(&self, tx_ref: &str) -> AppResult<GatewayVerification> {
        let response = self
            .client
            .get(format!(
                "{}/transactions/verify_by_reference",
                self.base_url
            ))
            .query(&[("tx_ref", tx_ref)])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(|e| upstream("Flutterwave verification request failed", e))?;

        let status = response.status();
        let envelope: Envelope<VerificationData> = response
            .json()
            .await
            .map_err(|e| upstream("Flutterwave verification response unreadable", e))?;

        if !status.is_success() || envelope.status != "success" {
            return Err(AppError::Upstream(format!(
                "Flutterwave verification rejected ({}): {}",
                status,
                envelope.message.unwrap_or_default()
            )));
        }

        let data = envelope.data.ok_or_else(|| {
            AppError::Upstream("Flutterwave verification response without data".into())
        })?;

        let gateway_status = data.status.as_deref().unwrap_or("");
        let snapshot = json!({
            "id": &data.id,
            "status": gateway_status,
            "amount": data.amount,
            "currency": &data.currency,
            "processor_response": &data.processor_response,
        });

        Ok(GatewayVerification {
            status: settlement_from_gateway_status(gateway_status),
            amount_cents: (data.amount.unwrap_or(0.0) * 100.0).round() as i64,
            currency: data.currency.unwrap_or_default(),
            gateway_tx_id: json_id_to_string(&data.id),
            plan_code: json_id_to_string(&data.payment_plan),
            failure_reason: data.processor_response,
            snapshot,
        })
    }
}
