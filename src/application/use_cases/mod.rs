pub mod access_grant;
pub mod checkout;
pub mod ledger;
pub mod messaging;
pub mod reconciliation;
pub mod sweeps;
