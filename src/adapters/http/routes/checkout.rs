use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::use_cases::checkout::CheckoutRequest,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/checkout", post(start_checkout))
}

async fn start_checkout(
    State(app_state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<impl IntoResponse> {
    let response = app_state
        .checkout_use_cases
        .start_checkout(&request)
        .await?;
    Ok(Json(response))
}
