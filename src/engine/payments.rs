use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::dispatch::load_parcel;
use crate::engine::saga::Saga;
use crate::error::AppError;
use crate::models::parcel::{ParcelPatch, PaymentStatus};
use crate::models::payment::PaymentRecord;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub parcel_id: Uuid,
    pub email: String,
    pub amount: f64,
    pub transaction_id: String,
    pub payment_method: String,
}

/// Marks the parcel paid, then appends the ledger record. A failed append
/// reverts the parcel to its previous payment state.
pub async fn record_payment(state: &AppState, payment: NewPayment) -> Result<PaymentRecord, AppError> {
    let result = try_record(state, payment).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::Internal(_)) => "error",
        Err(_) => "rejected",
    };
    state
        .metrics
        .payments_recorded_total
        .with_label_values(&[outcome])
        .inc();

    result
}

async fn try_record(state: &AppState, payment: NewPayment) -> Result<PaymentRecord, AppError> {
    let parcel = load_parcel(state, payment.parcel_id).await?;
    if parcel.payment_status == PaymentStatus::Paid {
        return Err(AppError::Conflict(format!(
            "parcel {} is already paid",
            parcel.id
        )));
    }

    let now = Utc::now();
    let mut saga = Saga::new("record_payment");

    state
        .stores
        .parcels
        .update_parcel(
            parcel.id,
            ParcelPatch {
                payment_status: Some(PaymentStatus::Paid),
                paid_at: Some(Some(now)),
                ..Default::default()
            },
        )
        .await?;

    let parcels = state.stores.parcels.clone();
    let restore = ParcelPatch {
        payment_status: Some(parcel.payment_status),
        paid_at: Some(parcel.paid_at),
        ..Default::default()
    };
    let parcel_id = parcel.id;
    saga.completed("mark parcel paid", async move {
        parcels.update_parcel(parcel_id, restore).await.map(|_| ())
    });

    let record = PaymentRecord {
        id: Uuid::new_v4(),
        parcel_id: parcel.id,
        email: payment.email,
        amount: payment.amount,
        transaction_id: payment.transaction_id,
        payment_method: payment.payment_method,
        paid_at: now,
    };

    let record = match state.stores.payments.insert_payment(record).await {
        Ok(record) => record,
        Err(err) => return Err(saga.abort("append payment record", err, &state.metrics).await),
    };

    info!(
        parcel_id = %record.parcel_id,
        transaction_id = %record.transaction_id,
        amount = record.amount,
        "payment recorded"
    );

    Ok(record)
}
