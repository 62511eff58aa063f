use axum::{
    Router,
    extract::{Query, RawQuery, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::use_cases::reconciliation::CallbackOutcome,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/callback", get(handle_callback))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    tx_ref: Option<String>,
    #[serde(rename = "txRef")]
    tx_ref_camel: Option<String>,
}

async fn handle_callback(
    State(app_state): State<AppState>,
    Query(params): Query<CallbackParams>,
    RawQuery(raw_query): RawQuery,
) -> AppResult<impl IntoResponse> {
    let tx_ref = params.tx_ref.or(params.tx_ref_camel);
    let outcome = app_state
        .reconciliation_use_cases
        .process_callback(tx_ref.as_deref(), raw_query.as_deref().unwrap_or(""))
        .await?;

    Ok(match outcome {
        CallbackOutcome::Received => "received",
        CallbackOutcome::Ignored => "ignored",
    })
}
