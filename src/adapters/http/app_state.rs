use std::sync::Arc;

use crate::{
    application::use_cases::{
        access_grant::AccessGrantUseCases, checkout::CheckoutUseCases,
        reconciliation::ReconciliationUseCases, sweeps::SweepUseCases,
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub checkout_use_cases: Arc<CheckoutUseCases>,
    pub reconciliation_use_cases: Arc<ReconciliationUseCases>,
    pub access_use_cases: Arc<AccessGrantUseCases>,
    pub sweep_use_cases: Arc<SweepUseCases>,
}
