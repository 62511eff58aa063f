use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::use_cases::reconciliation::ReconcileOutcome,
};

const SIGNATURE_HEADER: &str = "verif-hash";

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(handle_webhook))
}

/// The gateway expects short plain-text acknowledgements, not the JSON error
/// envelope, so the reconciliation error cases are mapped here by hand.
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match app_state
        .reconciliation_use_cases
        .process_webhook(signature, &payload)
        .await
    {
        Ok(outcome) => {
            let status = match outcome {
                ReconcileOutcome::Mismatch => StatusCode::BAD_REQUEST,
                _ => StatusCode::OK,
            };
            (status, outcome.token()).into_response()
        }
        Err(AppError::Unauthorized) => {
            (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
        }
        Err(AppError::ProviderNotConfigured) => {
            tracing::error!("Webhook refused - signature hash not configured");
            (StatusCode::INTERNAL_SERVER_ERROR, "misconfigured").into_response()
        }
        Err(AppError::Upstream(e)) => {
            tracing::warn!(error = %e, "Webhook verification round-trip failed");
            (StatusCode::BAD_GATEWAY, "verify-failed").into_response()
        }
        Err(e) => e.into_response(),
    }
}
