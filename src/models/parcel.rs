use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    RiderAssigned,
    InTransit,
    Delivered,
    ServiceCenterDelivered,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 5] = [
        DeliveryStatus::Pending,
        DeliveryStatus::RiderAssigned,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
        DeliveryStatus::ServiceCenterDelivered,
    ];

    /// Both terminal states count as a completed delivery.
    pub fn is_delivered(self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::ServiceCenterDelivered
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::RiderAssigned => "rider_assigned",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::ServiceCenterDelivered => "service_center_delivered",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignedRider {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub id: Uuid,
    pub tracking_id: String,
    pub title: String,
    pub parcel_type: String,
    pub weight: Option<f64>,
    pub sender_email: String,
    pub sender_name: String,
    pub sender_contact: String,
    #[serde(rename = "senderRegion")]
    pub sender_region: String,
    pub sender_address: Option<String>,
    pub receiver_name: String,
    pub receiver_contact: String,
    #[serde(rename = "receiverRegion")]
    pub receiver_region: String,
    pub receiver_address: Option<String>,
    pub total_cost: f64,
    pub delivery_status: DeliveryStatus,
    pub payment_status: PaymentStatus,
    pub assigned_rider: Option<AssignedRider>,
    #[serde(rename = "isCashedOut")]
    pub is_cashed_out: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub picked_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cashed_out_at: Option<DateTime<Utc>>,
}

impl Parcel {
    pub fn rider_email(&self) -> Option<&str> {
        self.assigned_rider.as_ref().map(|rider| rider.email.as_str())
    }

    pub fn same_region(&self) -> bool {
        self.sender_region
            .trim()
            .eq_ignore_ascii_case(self.receiver_region.trim())
    }
}

/// Partial update of a parcel. `None` leaves a field untouched; nullable
/// fields use a nested `Option` so they can be cleared. Owner and cost are
/// fixed at creation and not patchable.
#[derive(Debug, Clone, Default)]
pub struct ParcelPatch {
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub assigned_rider: Option<Option<AssignedRider>>,
    pub is_cashed_out: Option<bool>,
    pub paid_at: Option<Option<DateTime<Utc>>>,
    pub assigned_at: Option<Option<DateTime<Utc>>>,
    pub picked_at: Option<Option<DateTime<Utc>>>,
    pub delivered_at: Option<Option<DateTime<Utc>>>,
    pub cashed_out_at: Option<Option<DateTime<Utc>>>,
}

impl ParcelPatch {
    pub fn apply(self, parcel: &mut Parcel) {
        if let Some(status) = self.delivery_status {
            parcel.delivery_status = status;
        }
        if let Some(status) = self.payment_status {
            parcel.payment_status = status;
        }
        if let Some(rider) = self.assigned_rider {
            parcel.assigned_rider = rider;
        }
        if let Some(flag) = self.is_cashed_out {
            parcel.is_cashed_out = flag;
        }
        if let Some(at) = self.paid_at {
            parcel.paid_at = at;
        }
        if let Some(at) = self.assigned_at {
            parcel.assigned_at = at;
        }
        if let Some(at) = self.picked_at {
            parcel.picked_at = at;
        }
        if let Some(at) = self.delivered_at {
            parcel.delivered_at = at;
        }
        if let Some(at) = self.cashed_out_at {
            parcel.cashed_out_at = at;
        }
        parcel.updated_at = Utc::now();
    }

    /// Undo for a rider assignment. Payment and cash-out fields are owned by
    /// other operations and left alone.
    pub fn undo_assignment(before: &Parcel) -> Self {
        Self {
            delivery_status: Some(before.delivery_status),
            assigned_rider: Some(before.assigned_rider.clone()),
            assigned_at: Some(before.assigned_at),
            ..Default::default()
        }
    }

    /// Undo for a delivery status update.
    pub fn undo_status_update(before: &Parcel) -> Self {
        Self {
            delivery_status: Some(before.delivery_status),
            picked_at: Some(before.picked_at),
            delivered_at: Some(before.delivered_at),
            ..Default::default()
        }
    }
}

/// Filter for parcel queries; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ParcelFilter {
    pub sender_email: Option<String>,
    pub rider_email: Option<String>,
    pub delivery_statuses: Option<Vec<DeliveryStatus>>,
    pub payment_status: Option<PaymentStatus>,
}

impl ParcelFilter {
    pub fn matches(&self, parcel: &Parcel) -> bool {
        if let Some(email) = &self.sender_email {
            if !parcel.sender_email.eq_ignore_ascii_case(email) {
                return false;
            }
        }
        if let Some(email) = &self.rider_email {
            match parcel.rider_email() {
                Some(rider) if rider.eq_ignore_ascii_case(email) => {}
                _ => return false,
            }
        }
        if let Some(statuses) = &self.delivery_statuses {
            if !statuses.contains(&parcel.delivery_status) {
                return false;
            }
        }
        if let Some(status) = self.payment_status {
            if parcel.payment_status != status {
                return false;
            }
        }
        true
    }
}

pub fn generate_tracking_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("PCL-{}-{}", now.format("%Y%m%d"), suffix)
}
