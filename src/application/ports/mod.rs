pub mod mailer;
pub mod payment_gateway;
