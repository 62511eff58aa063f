use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::{adapters::http::app_state::AppState, app_error::AppResult};

const DEFAULT_SWEEP_LIMIT: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/expiry", get(run_expiry))
        .route("/retry-messages", get(run_retry_messages))
        .route("/reconcile", get(run_reconcile))
}

#[derive(Debug, Deserialize)]
struct CronParams {
    key: Option<String>,
    limit: Option<i64>,
}

/// Shared-secret gate for the sweep endpoints. The caller is an external
/// scheduler, not a browser, so answers are terse plain text.
fn authorize(app_state: &AppState, params: &CronParams) -> Result<(), Response> {
    let expected = app_state.config.cron_secret.expose_secret();
    match &params.key {
        Some(key) if key.as_bytes() == expected.as_bytes() => Ok(()),
        _ => Err((StatusCode::FORBIDDEN, "forbidden").into_response()),
    }
}

async fn run_expiry(
    State(app_state): State<AppState>,
    Query(params): Query<CronParams>,
) -> Result<AppResult<String>, Response> {
    authorize(&app_state, &params)?;
    Ok(expiry_summary(&app_state).await)
}

async fn expiry_summary(app_state: &AppState) -> AppResult<String> {
    let summary = app_state.sweep_use_cases.run_expiry_sweep().await?;
    Ok(format!(
        "downgraded={} reminders_sent={} reminders_failed={}",
        summary.downgraded, summary.reminders_sent, summary.reminders_failed
    ))
}

async fn run_retry_messages(
    State(app_state): State<AppState>,
    Query(params): Query<CronParams>,
) -> Result<AppResult<String>, Response> {
    authorize(&app_state, &params)?;
    let limit = params.limit.unwrap_or(DEFAULT_SWEEP_LIMIT);
    Ok(retry_summary(&app_state, limit).await)
}

async fn retry_summary(app_state: &AppState, limit: i64) -> AppResult<String> {
    let summary = app_state.sweep_use_cases.run_message_retry(limit).await?;
    Ok(format!(
        "attempted={} delivered={}",
        summary.attempted, summary.delivered
    ))
}

async fn run_reconcile(
    State(app_state): State<AppState>,
    Query(params): Query<CronParams>,
) -> Result<AppResult<String>, Response> {
    authorize(&app_state, &params)?;
    let limit = params.limit.unwrap_or(DEFAULT_SWEEP_LIMIT);
    Ok(reconcile_summary(&app_state, limit).await)
}

async fn reconcile_summary(app_state: &AppState, limit: i64) -> AppResult<String> {
    let summary = app_state.sweep_use_cases.run_reconcile_sweep(limit).await?;
    Ok(format!(
        "examined={} settled={} failed={} still_pending={}",
        summary.examined, summary.settled, summary.failed, summary.still_pending
    ))
}
