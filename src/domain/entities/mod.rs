pub mod audit;
pub mod failed_message;
pub mod payment;
pub mod pricing;
pub mod subscription;
pub mod user_access;
