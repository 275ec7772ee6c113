//! In-process store backed by `DashMap`s, one map per collection.
//!
//! Single-document operations are atomic per shard lock. Guards are never
//! held across an `.await` or while touching a second map.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{
    ParcelStore, PaymentStore, RiderStore, StoreError, StoreResult, TrackingStore, UserStore,
};
use crate::models::parcel::{Parcel, ParcelFilter, ParcelPatch};
use crate::models::payment::PaymentRecord;
use crate::models::rider::{ApplicationStatus, RiderApplication, RiderFilter, WorkStatus};
use crate::models::tracking::TrackingEvent;
use crate::models::user::{Role, User};

#[derive(Default)]
pub struct MemoryStore {
    parcels: DashMap<Uuid, Parcel>,
    riders: DashMap<Uuid, RiderApplication>,
    // keyed by lowercased email, which makes the uniqueness check atomic
    users: DashMap<String, User>,
    tracking: DashMap<String, Vec<TrackingEvent>>,
    payments: DashMap<Uuid, PaymentRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn user_key_for_id(&self, id: Uuid) -> Option<String> {
        self.users
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.key().clone())
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl ParcelStore for MemoryStore {
    async fn insert_parcel(&self, parcel: Parcel) -> StoreResult<Parcel> {
        match self.parcels.entry(parcel.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "parcel {} already exists",
                parcel.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(parcel.clone());
                Ok(parcel)
            }
        }
    }

    async fn get_parcel(&self, id: Uuid) -> StoreResult<Option<Parcel>> {
        Ok(self.parcels.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_parcels(&self, filter: &ParcelFilter) -> StoreResult<Vec<Parcel>> {
        let mut parcels: Vec<Parcel> = self
            .parcels
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        parcels.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(parcels)
    }

    async fn update_parcel(&self, id: Uuid, patch: ParcelPatch) -> StoreResult<Parcel> {
        let mut parcel = self
            .parcels
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("parcel {id} not found")))?;

        patch.apply(&mut parcel);
        Ok(parcel.clone())
    }

    async fn delete_parcel(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.parcels.remove(&id).is_some())
    }

    async fn count_parcels(&self) -> StoreResult<usize> {
        Ok(self.parcels.len())
    }
}

#[async_trait]
impl RiderStore for MemoryStore {
    async fn insert_rider(&self, rider: RiderApplication) -> StoreResult<RiderApplication> {
        self.riders.insert(rider.id, rider.clone());
        Ok(rider)
    }

    async fn get_rider(&self, id: Uuid) -> StoreResult<Option<RiderApplication>> {
        Ok(self.riders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_riders(&self, filter: &RiderFilter) -> StoreResult<Vec<RiderApplication>> {
        let mut riders: Vec<RiderApplication> = self
            .riders
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        riders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(riders)
    }

    async fn update_rider_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        work_status: Option<WorkStatus>,
    ) -> StoreResult<RiderApplication> {
        let mut rider = self
            .riders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("rider application {id} not found")))?;

        rider.status = status;
        rider.work_status = work_status;
        rider.updated_at = Utc::now();
        Ok(rider.clone())
    }

    async fn set_work_status(
        &self,
        id: Uuid,
        work_status: WorkStatus,
    ) -> StoreResult<RiderApplication> {
        let mut rider = self
            .riders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("rider {id} not found")))?;

        rider.work_status = Some(work_status);
        rider.updated_at = Utc::now();
        Ok(rider.clone())
    }

    async fn count_riders(&self) -> StoreResult<usize> {
        Ok(self.riders.len())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        match self.users.entry(email_key(&user.email)) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "user {} already exists",
                user.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .get(&email_key(email))
            .map(|entry| entry.value().clone()))
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone()))
    }

    async fn search_users(&self, email_fragment: &str, limit: usize) -> StoreResult<Vec<User>> {
        let needle = email_key(email_fragment);
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| entry.key().contains(&needle))
            .map(|entry| entry.value().clone())
            .collect();

        users.sort_by(|a, b| a.email.cmp(&b.email));
        users.truncate(limit);
        Ok(users)
    }

    async fn touch_login(&self, email: &str) -> StoreResult<User> {
        let mut user = self
            .users
            .get_mut(&email_key(email))
            .ok_or_else(|| StoreError::NotFound(format!("user {email} not found")))?;

        user.last_log_in = Utc::now();
        Ok(user.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<User> {
        let key = self
            .user_key_for_id(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id} not found")))?;

        let mut user = self
            .users
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("user {id} not found")))?;

        user.role = role;
        Ok(user.clone())
    }

    async fn count_users(&self) -> StoreResult<usize> {
        Ok(self.users.len())
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn append_event(&self, event: TrackingEvent) -> StoreResult<TrackingEvent> {
        self.tracking
            .entry(event.tracking_id.clone())
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn events_for(&self, tracking_id: &str) -> StoreResult<Vec<TrackingEvent>> {
        let mut events = self
            .tracking
            .get(tracking_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        // the log is in append order; a stable sort on the reversed log keeps
        // later appends first among equal timestamps
        events.reverse();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, payment: PaymentRecord) -> StoreResult<PaymentRecord> {
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find_payments(&self, email: Option<&str>) -> StoreResult<Vec<PaymentRecord>> {
        let mut payments: Vec<PaymentRecord> = self
            .payments
            .iter()
            .filter(|entry| match email {
                Some(email) => entry.value().email.eq_ignore_ascii_case(email),
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();

        payments.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(payments)
    }

    async fn count_payments(&self) -> StoreResult<usize> {
        Ok(self.payments.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::MemoryStore;
    use crate::models::tracking::TrackingEvent;
    use crate::models::user::{Role, User};
    use crate::store::{StoreError, TrackingStore, UserStore};

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            role: Role::User,
            created_at: Utc::now(),
            last_log_in: Utc::now(),
        }
    }

    fn event(tracking_id: &str, status: &str, offset_secs: i64) -> TrackingEvent {
        TrackingEvent {
            id: Uuid::new_v4(),
            tracking_id: tracking_id.to_string(),
            parcel_id: None,
            status: status.to_string(),
            location: "Hub".to_string(),
            updated_by: "ops@example.com".to_string(),
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = MemoryStore::new();
        store.insert_user(user("Ann@Example.com")).await.unwrap();

        let err = store.insert_user(user("ann@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn set_role_by_id_updates_the_email_keyed_entry() {
        let store = MemoryStore::new();
        let created = store.insert_user(user("rider@example.com")).await.unwrap();

        store.set_role(created.id, Role::Rider).await.unwrap();

        let fetched = store
            .get_user_by_email("rider@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.role, Role::Rider);
    }

    #[tokio::test]
    async fn tracking_events_come_back_newest_first() {
        let store = MemoryStore::new();
        store.append_event(event("PCL-1", "created", -60)).await.unwrap();
        store.append_event(event("PCL-1", "picked", 0)).await.unwrap();
        store.append_event(event("PCL-2", "created", 0)).await.unwrap();

        let events = store.events_for("PCL-1").await.unwrap();
        let statuses: Vec<&str> = events.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["picked", "created"]);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_latest_append_first() {
        let store = MemoryStore::new();
        let first = event("PCL-9", "first", 0);
        let mut second = event("PCL-9", "second", 0);
        second.timestamp = first.timestamp;

        store.append_event(first).await.unwrap();
        store.append_event(second).await.unwrap();

        let events = store.events_for("PCL-9").await.unwrap();
        assert_eq!(events[0].status, "second");
    }

    #[tokio::test]
    async fn unknown_tracking_id_yields_empty_log() {
        let store = MemoryStore::new();
        assert!(store.events_for("missing").await.unwrap().is_empty());
    }
}
