use std::env;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_IDENTITY_LOOKUP_URL: &str =
    "https://identitytoolkit.googleapis.com/v1/accounts:lookup";
const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub identity_lookup_url: String,
    pub identity_api_key: String,
    pub payment_api_base: String,
    pub payment_secret_key: String,
    pub payment_currency: String,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("PORT", 5000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: non_zero(
                "EVENT_BUFFER_SIZE",
                parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            )?,
            identity_lookup_url: env::var("IDENTITY_LOOKUP_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_LOOKUP_URL.to_string()),
            identity_api_key: required("IDENTITY_API_KEY")?,
            payment_api_base: env::var("PAYMENT_API_BASE")
                .unwrap_or_else(|_| DEFAULT_PAYMENT_API_BASE.to_string()),
            payment_secret_key: required("PAYMENT_SECRET_KEY")?,
            payment_currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            upstream_timeout: Duration::from_millis(parse_or_default("UPSTREAM_TIMEOUT_MS", 10_000)?),
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Internal(format!("missing required setting {key}")))
}

fn non_zero(key: &str, value: usize) -> Result<usize, AppError> {
    if value == 0 {
        return Err(AppError::Internal(format!("{key} must be greater than zero")));
    }
    Ok(value)
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::non_zero;
    use crate::error::AppError;

    #[test]
    fn zero_event_buffer_is_rejected() {
        assert!(matches!(
            non_zero("EVENT_BUFFER_SIZE", 0),
            Err(AppError::Internal(msg)) if msg.contains("EVENT_BUFFER_SIZE")
        ));
        assert_eq!(non_zero("EVENT_BUFFER_SIZE", 16).unwrap(), 16);
    }
}
