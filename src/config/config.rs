use crate::constants::constants::{DEFAULT_CURRENCY, DEFAULT_UPI_NOTE};
use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

pub struct Config {
    pub port: u16,
    pub ledger_base_url: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub session_token: Option<String>,
    pub request_timeout: Duration,
    pub upi_currency: String,
    pub upi_transaction_note: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("ledger_base_url", &self.ledger_base_url)
            .field("log_level", &self.log_level)
            .field("jwt_secret", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout", &self.request_timeout)
            .field("upi_currency", &self.upi_currency)
            .field("upi_transaction_note", &self.upi_transaction_note)
            .finish()
    }
}

impl Config {
    fn from_env() -> Self {
        dotenv().ok();

        Self {
            port: env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8002),
            ledger_base_url: env::var("LEDGER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8002/api".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string()),
            session_token: env::var("SESSION_TOKEN").ok().filter(|v| !v.trim().is_empty()),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            upi_currency: env::var("UPI_CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_string()),
            upi_transaction_note: env::var("UPI_TRANSACTION_NOTE")
                .unwrap_or_else(|_| DEFAULT_UPI_NOTE.to_string()),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
