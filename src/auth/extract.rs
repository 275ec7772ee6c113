use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use super::Identity;
use super::policy::{Decision, authorize};
use super::verifier::VerifyError;
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

/// Any caller holding a token the identity provider accepts.
pub struct Caller(pub Identity);

/// Verified caller whose stored role is `admin`.
pub struct AdminCaller(pub Identity);

/// Verified caller whose stored role is `rider`.
pub struct RiderCaller(pub Identity);

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let raw = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("missing authorization header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthenticated("malformed authorization header".to_string()))?;

    let token = raw
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthenticated("expected a bearer token".to_string()))?;

    Ok(token)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers) {
            Ok(token) => token,
            Err(err) => {
                state.metrics.record_auth_rejection("missing_token");
                return Err(err);
            }
        };

        match state.identity.verify(token).await {
            Ok(identity) => Ok(Caller(identity)),
            Err(VerifyError::Rejected(reason)) => {
                state.metrics.record_auth_rejection("invalid_token");
                warn!(reason = %reason, "bearer token rejected");
                Err(AppError::Forbidden("token verification failed".to_string()))
            }
            Err(err @ VerifyError::Unavailable(_)) => Err(AppError::Internal(err.to_string())),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        require_role(state, identity, Role::Admin).await.map(AdminCaller)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RiderCaller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        require_role(state, identity, Role::Rider).await.map(RiderCaller)
    }
}

async fn require_role(
    state: &AppState,
    identity: Identity,
    required: Role,
) -> Result<Identity, AppError> {
    let stored = stored_user(state, &identity).await?;

    match authorize(&identity, stored.as_ref(), required) {
        Decision::Allow => Ok(identity),
        Decision::Deny(reason) => {
            state.metrics.record_auth_rejection("role");
            warn!(email = %identity.email, required = required.as_str(), reason, "role check failed");
            Err(AppError::Forbidden(reason.to_string()))
        }
    }
}

pub async fn stored_user(state: &AppState, identity: &Identity) -> Result<Option<User>, AppError> {
    Ok(state.stores.users.get_user_by_email(&identity.email).await?)
}
