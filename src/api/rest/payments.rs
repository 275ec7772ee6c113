use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{ApiJson, ApiQuery, required, required_text};
use crate::auth::extract::{Caller, stored_user};
use crate::auth::policy::can_act_for;
use crate::engine::payments::{self, NewPayment};
use crate::error::AppError;
use crate::gateway::GatewayError;
use crate::models::payment::{PaymentIntent, PaymentRecord};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments", post(record_payment).get(payment_history))
        .route("/create-payment-intent", post(create_payment_intent))
}

#[derive(Deserialize)]
pub struct RecordPaymentRequest {
    pub parcel_id: Option<Uuid>,
    pub email: Option<String>,
    pub amount: Option<f64>,
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct IntentRequest {
    pub amount_in_cents: Option<i64>,
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    Caller(_identity): Caller,
    ApiJson(payload): ApiJson<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentRecord>), AppError> {
    let payment = NewPayment {
        parcel_id: required(payload.parcel_id, "parcel_id")?,
        email: required_text(payload.email, "email")?,
        amount: required(payload.amount, "amount")?,
        transaction_id: required_text(payload.transaction_id, "transaction_id")?,
        payment_method: required_text(payload.payment_method, "payment_method")?,
    };

    let record = payments::record_payment(&state, payment).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn payment_history(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    let email = query.email.unwrap_or_else(|| identity.email.clone());

    let stored = stored_user(&state, &identity).await?;
    if !can_act_for(&identity, stored.as_ref(), &email) {
        return Err(AppError::Forbidden(
            "cannot read another user's payments".to_string(),
        ));
    }

    let payments = state.stores.payments.find_payments(Some(&email)).await?;
    Ok(Json(payments))
}

async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiJson(payload): ApiJson<IntentRequest>,
) -> Result<Json<PaymentIntent>, AppError> {
    let amount = required(payload.amount_in_cents, "amount_in_cents")?;
    let amount = u64::try_from(amount)
        .ok()
        .filter(|amount| *amount > 0)
        .ok_or_else(|| {
            AppError::BadRequest("amount_in_cents must be a positive integer".to_string())
        })?;

    let intent = state
        .gateway
        .create_intent(amount, &state.currency)
        .await
        .map_err(|err| match err {
            GatewayError::Rejected(msg) => AppError::BadRequest(msg),
            GatewayError::Unavailable(msg) => AppError::Internal(msg),
        })?;

    info!(email = %identity.email, amount, currency = %state.currency, "payment intent created");
    Ok(Json(intent))
}
