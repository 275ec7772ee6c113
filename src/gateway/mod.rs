//! Payment-intent service. The gateway only creates intents; recording a
//! completed payment is a separate call made later by the client.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::payment::PaymentIntent;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment service rejected the request: {0}")]
    Rejected(String),
    #[error("payment service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(
        &self,
        amount_minor: u64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError>;
}

pub struct StripePaymentGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Deserialize)]
struct IntentResponse {
    client_secret: Option<String>,
}

impl StripePaymentGateway {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            secret_key: secret_key.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_intent(
        &self,
        amount_minor: u64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.api_base.trim_end_matches('/'));
        let amount = amount_minor.to_string();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", currency),
                ("payment_method_types[]", "card"),
            ])
            .send()
            .await
            .map_err(|err| GatewayError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("{status}: {detail}")));
        }
        if !status.is_success() {
            return Err(GatewayError::Unavailable(format!("payment service answered {status}")));
        }

        let body: IntentResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Unavailable(format!("malformed intent response: {err}")))?;

        let client_secret = body
            .client_secret
            .ok_or_else(|| GatewayError::Unavailable("intent has no client secret".to_string()))?;

        Ok(PaymentIntent { client_secret })
    }
}

/// Deterministic gateway for tests; remembers every requested amount.
#[derive(Default)]
pub struct StaticPaymentGateway {
    requests: Mutex<Vec<(u64, String)>>,
}

impl StaticPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<(u64, String)> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for StaticPaymentGateway {
    async fn create_intent(
        &self,
        amount_minor: u64,
        currency: &str,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|_| GatewayError::Unavailable("request log poisoned".to_string()))?;
        requests.push((amount_minor, currency.to_string()));

        Ok(PaymentIntent {
            client_secret: format!("pi_static_{}_secret_{amount_minor}", requests.len()),
        })
    }
}
