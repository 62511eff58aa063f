pub mod access;
pub mod callback;
pub mod checkout;
pub mod cron;
pub mod webhook;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing_router())
        .nest("/cron", cron::router())
}

fn billing_router() -> Router<AppState> {
    Router::new()
        .merge(checkout::router())
        .merge(webhook::router())
        .merge(callback::router())
        .merge(access::router())
}
