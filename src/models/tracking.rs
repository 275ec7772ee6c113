use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub tracking_id: String,
    pub parcel_id: Option<Uuid>,
    pub status: String,
    pub location: String,
    pub updated_by: String,
    pub timestamp: DateTime<Utc>,
}
