use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WorkStatus {
    Available,
    InDelivery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderApplication {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: Option<u8>,
    pub phone: String,
    pub region: String,
    pub district: String,
    pub bike_brand: String,
    pub bike_registration: String,
    pub nid: String,
    pub status: ApplicationStatus,
    pub work_status: Option<WorkStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RiderApplication {
    pub fn is_busy(&self) -> bool {
        self.work_status == Some(WorkStatus::InDelivery)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiderFilter {
    pub email: Option<String>,
    pub statuses: Option<Vec<ApplicationStatus>>,
    pub district: Option<String>,
    pub work_status: Option<WorkStatus>,
}

impl RiderFilter {
    pub fn matches(&self, rider: &RiderApplication) -> bool {
        if let Some(email) = &self.email {
            if !rider.email.eq_ignore_ascii_case(email) {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&rider.status) {
                return false;
            }
        }
        if let Some(district) = &self.district {
            if !rider.district.eq_ignore_ascii_case(district.trim()) {
                return false;
            }
        }
        if let Some(work_status) = self.work_status {
            if rider.work_status != Some(work_status) {
                return false;
            }
        }
        true
    }
}
