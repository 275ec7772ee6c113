use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub parcel_id: Uuid,
    pub email: String,
    pub amount: f64,
    pub transaction_id: String,
    pub payment_method: String,
    pub paid_at: DateTime<Utc>,
}

/// Client secret handed back by the payment-intent service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
}
