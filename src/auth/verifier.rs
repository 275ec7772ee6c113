use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use super::Identity;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Turns an opaque bearer token into a verified identity. Signature and
/// expiry checks belong to the provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError>;
}

/// Verifies tokens through an account-lookup endpoint in the style of the
/// Identity Toolkit `accounts:lookup` call.
pub struct HttpIdentityVerifier {
    client: reqwest::Client,
    lookup_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupAccount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupAccount {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

impl HttpIdentityVerifier {
    pub fn new(
        lookup_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            lookup_url: lookup_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        let response = self
            .client
            .post(&self.lookup_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|err| VerifyError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(VerifyError::Rejected(format!("provider answered {status}")));
        }
        if !status.is_success() {
            return Err(VerifyError::Unavailable(format!("provider answered {status}")));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|err| VerifyError::Unavailable(format!("malformed lookup response: {err}")))?;

        let account = body
            .users
            .into_iter()
            .next()
            .ok_or_else(|| VerifyError::Rejected("no account for token".to_string()))?;

        let email = account
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| VerifyError::Rejected("account has no email".to_string()))?;

        Ok(Identity {
            uid: account.local_id,
            email,
            name: account.display_name,
        })
    }
}

/// Fixed token table, for tests and local runs without a provider.
#[derive(Default)]
pub struct StaticIdentityVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, email: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            Identity {
                uid: format!("uid-{token}"),
                email: email.to_string(),
                name: None,
            },
        );
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| VerifyError::Rejected("unknown token".to_string()))
    }
}
