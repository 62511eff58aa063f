use std::sync::Arc;

use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{CreateSessionRequest, PaymentGatewayPort},
    application::use_cases::ledger::{CreatePaymentInput, PaymentRepo},
    domain::entities::pricing,
};

const TX_REF_PREFIX: &str = "bv";
const TX_REF_SUFFIX_LEN: usize = 10;
/// Collisions are negligible; a couple of retries is already paranoia.
const MAX_TX_REF_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub email: String,
    /// Optional currency override; anything unsupported falls back to the
    /// default resolution.
    pub currency: Option<String>,
    /// Gateway plan id for recurring billing.
    pub payment_plan: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub link: String,
    pub tx_ref: String,
}

/// Payment Initiation Service: obtains a hosted session from the gateway and
/// only then records the `initiated` Payment, so no local row ever exists
/// without a corresponding gateway session.
pub struct CheckoutUseCases {
    payments: Arc<dyn PaymentRepo>,
    gateway: Arc<dyn PaymentGatewayPort>,
    redirect_url: String,
    payment_options: Option<String>,
}

impl CheckoutUseCases {
    pub fn new(
        payments: Arc<dyn PaymentRepo>,
        gateway: Arc<dyn PaymentGatewayPort>,
        redirect_url: String,
        payment_options: Option<String>,
    ) -> Self {
        Self {
            payments,
            gateway,
            redirect_url,
            payment_options,
        }
    }

    pub async fn start_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResponse> {
        let (currency, amount_cents) = pricing::resolve_currency(request.currency.as_deref());

        for attempt in 1..=MAX_TX_REF_ATTEMPTS {
            let tx_ref = new_tx_ref(request.user_id);

            let session = self
                .gateway
                .create_session(&CreateSessionRequest {
                    tx_ref: tx_ref.clone(),
                    amount_cents,
                    currency: currency.to_string(),
                    redirect_url: self.redirect_url.clone(),
                    customer_email: request.email.clone(),
                    payment_options: self.payment_options.clone(),
                    payment_plan: request.payment_plan.clone(),
                    user_id: request.user_id,
                })
                .await?;

            match self
                .payments
                .create(&CreatePaymentInput {
                    user_id: request.user_id,
                    tx_ref: tx_ref.clone(),
                    amount_cents,
                    currency: currency.to_string(),
                })
                .await
            {
                Ok(_) => {
                    info!(
                        user_id = %request.user_id,
                        tx_ref,
                        currency,
                        amount_cents,
                        "Initiated payment"
                    );
                    return Ok(CheckoutResponse {
                        link: session.link,
                        tx_ref,
                    });
                }
                Err(AppError::Conflict(_)) => {
                    // A reused reference must never be silently reattached
                    // to a new session; regenerate and start over.
                    warn!(tx_ref, attempt, "tx_ref collision, regenerating");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Internal(
            "could not generate a unique payment reference".into(),
        ))
    }
}

fn new_tx_ref(user_id: Uuid) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TX_REF_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{TX_REF_PREFIX}-{user_id}-{suffix}")
}
