pub mod app;
pub mod config;
pub mod db;
pub mod flutterwave_client;
pub mod http_client;
pub mod mailtrap_client;
pub mod setup;
