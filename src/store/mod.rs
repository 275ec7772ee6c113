//! Persistence seams, one trait per collection.
//!
//! Every method is a single-document operation. Nothing here spans two
//! documents; callers that need several writes sequence them through
//! [`crate::engine::saga::Saga`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::parcel::{Parcel, ParcelFilter, ParcelPatch};
use crate::models::payment::PaymentRecord;
use crate::models::rider::{ApplicationStatus, RiderApplication, RiderFilter, WorkStatus};
use crate::models::tracking::TrackingEvent;
use crate::models::user::{Role, User};

pub mod memory;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ParcelStore: Send + Sync {
    async fn insert_parcel(&self, parcel: Parcel) -> StoreResult<Parcel>;
    async fn get_parcel(&self, id: Uuid) -> StoreResult<Option<Parcel>>;
    /// Newest first.
    async fn find_parcels(&self, filter: &ParcelFilter) -> StoreResult<Vec<Parcel>>;
    async fn update_parcel(&self, id: Uuid, patch: ParcelPatch) -> StoreResult<Parcel>;
    /// Returns whether a parcel was removed.
    async fn delete_parcel(&self, id: Uuid) -> StoreResult<bool>;
    async fn count_parcels(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait RiderStore: Send + Sync {
    async fn insert_rider(&self, rider: RiderApplication) -> StoreResult<RiderApplication>;
    async fn get_rider(&self, id: Uuid) -> StoreResult<Option<RiderApplication>>;
    /// Newest first.
    async fn find_riders(&self, filter: &RiderFilter) -> StoreResult<Vec<RiderApplication>>;
    async fn update_rider_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        work_status: Option<WorkStatus>,
    ) -> StoreResult<RiderApplication>;
    async fn set_work_status(&self, id: Uuid, work_status: WorkStatus)
    -> StoreResult<RiderApplication>;
    async fn count_riders(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: User) -> StoreResult<User>;
    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn search_users(&self, email_fragment: &str, limit: usize) -> StoreResult<Vec<User>>;
    async fn touch_login(&self, email: &str) -> StoreResult<User>;
    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<User>;
    async fn count_users(&self) -> StoreResult<usize>;
}

#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn append_event(&self, event: TrackingEvent) -> StoreResult<TrackingEvent>;
    /// Newest first; events with equal timestamps come back in reverse append order.
    async fn events_for(&self, tracking_id: &str) -> StoreResult<Vec<TrackingEvent>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, payment: PaymentRecord) -> StoreResult<PaymentRecord>;
    /// Newest first. `None` returns every payment.
    async fn find_payments(&self, email: Option<&str>) -> StoreResult<Vec<PaymentRecord>>;
    async fn count_payments(&self) -> StoreResult<usize>;
}

/// The five collections, injected as trait objects.
#[derive(Clone)]
pub struct Stores {
    pub parcels: Arc<dyn ParcelStore>,
    pub riders: Arc<dyn RiderStore>,
    pub users: Arc<dyn UserStore>,
    pub tracking: Arc<dyn TrackingStore>,
    pub payments: Arc<dyn PaymentStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(memory::MemoryStore::new()))
    }

    pub fn from_memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            parcels: store.clone(),
            riders: store.clone(),
            users: store.clone(),
            tracking: store.clone(),
            payments: store,
        }
    }
}
