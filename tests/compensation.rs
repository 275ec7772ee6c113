mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use common::{ADMIN, ANN, ANN_EMAIL, RIDER, TestApp, body_json, json_request, seed_user};
use parcel_dispatch::models::parcel::{DeliveryStatus, ParcelFilter, ParcelPatch, PaymentStatus};
use parcel_dispatch::models::payment::PaymentRecord;
use parcel_dispatch::models::rider::{
    ApplicationStatus, RiderApplication, RiderFilter, WorkStatus,
};
use parcel_dispatch::models::user::{Role, User};
use parcel_dispatch::store::memory::MemoryStore;
use parcel_dispatch::store::{
    ParcelStore, PaymentStore, RiderStore, StoreError, StoreResult, Stores, UserStore,
};

enum RiderFault {
    /// Every work-status write fails.
    Always,
    /// Only writes back to `available` fail.
    OnRelease,
    /// A payment for each assigned parcel lands first, then the write fails.
    AfterPayment,
}

struct FaultyRiders {
    inner: Arc<MemoryStore>,
    fault: RiderFault,
}

impl FaultyRiders {
    async fn pay_assigned_parcels(&self) {
        let assigned = self
            .inner
            .find_parcels(&ParcelFilter {
                delivery_statuses: Some(vec![DeliveryStatus::RiderAssigned]),
                ..Default::default()
            })
            .await
            .unwrap_or_default();

        for parcel in assigned {
            let now = Utc::now();
            let _ = self
                .inner
                .update_parcel(
                    parcel.id,
                    ParcelPatch {
                        payment_status: Some(PaymentStatus::Paid),
                        paid_at: Some(Some(now)),
                        ..Default::default()
                    },
                )
                .await;
            let _ = self
                .inner
                .insert_payment(PaymentRecord {
                    id: Uuid::new_v4(),
                    parcel_id: parcel.id,
                    email: parcel.sender_email.clone(),
                    amount: parcel.total_cost,
                    transaction_id: "pi_concurrent".to_string(),
                    payment_method: "card".to_string(),
                    paid_at: now,
                })
                .await;
        }
    }
}

fn offline() -> StoreResult<RiderApplication> {
    Err(StoreError::Unavailable("riders collection offline".to_string()))
}

#[async_trait]
impl RiderStore for FaultyRiders {
    async fn insert_rider(&self, rider: RiderApplication) -> StoreResult<RiderApplication> {
        self.inner.insert_rider(rider).await
    }

    async fn get_rider(&self, id: Uuid) -> StoreResult<Option<RiderApplication>> {
        self.inner.get_rider(id).await
    }

    async fn find_riders(&self, filter: &RiderFilter) -> StoreResult<Vec<RiderApplication>> {
        self.inner.find_riders(filter).await
    }

    async fn update_rider_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        work_status: Option<WorkStatus>,
    ) -> StoreResult<RiderApplication> {
        self.inner.update_rider_status(id, status, work_status).await
    }

    async fn set_work_status(
        &self,
        id: Uuid,
        work_status: WorkStatus,
    ) -> StoreResult<RiderApplication> {
        match self.fault {
            RiderFault::Always => offline(),
            RiderFault::OnRelease if work_status == WorkStatus::Available => offline(),
            RiderFault::OnRelease => self.inner.set_work_status(id, work_status).await,
            RiderFault::AfterPayment => {
                self.pay_assigned_parcels().await;
                offline()
            }
        }
    }

    async fn count_riders(&self) -> StoreResult<usize> {
        self.inner.count_riders().await
    }
}

/// Payment ledger that rejects every append.
struct ClosedLedger(Arc<MemoryStore>);

#[async_trait]
impl PaymentStore for ClosedLedger {
    async fn insert_payment(&self, _payment: PaymentRecord) -> StoreResult<PaymentRecord> {
        Err(StoreError::Unavailable("payments collection offline".to_string()))
    }

    async fn find_payments(&self, email: Option<&str>) -> StoreResult<Vec<PaymentRecord>> {
        self.0.find_payments(email).await
    }

    async fn count_payments(&self) -> StoreResult<usize> {
        self.0.count_payments().await
    }
}

/// User store whose role writes always fail.
struct FrozenRoles(Arc<MemoryStore>);

#[async_trait]
impl UserStore for FrozenRoles {
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        self.0.insert_user(user).await
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.0.get_user_by_email(email).await
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.0.get_user(id).await
    }

    async fn search_users(&self, email_fragment: &str, limit: usize) -> StoreResult<Vec<User>> {
        self.0.search_users(email_fragment, limit).await
    }

    async fn touch_login(&self, email: &str) -> StoreResult<User> {
        self.0.touch_login(email).await
    }

    async fn set_role(&self, _id: Uuid, _role: Role) -> StoreResult<User> {
        Err(StoreError::Unavailable("users collection offline".to_string()))
    }

    async fn count_users(&self) -> StoreResult<usize> {
        self.0.count_users().await
    }
}

async fn app_with_riders(fault: RiderFault) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mut stores = Stores::from_memory(store.clone());
    stores.riders = Arc::new(FaultyRiders {
        inner: store.clone(),
        fault,
    });
    TestApp::with_stores(store, stores).await
}

fn assign_request(parcel_id: Uuid, rider_id: Uuid) -> axum::http::Request<axum::body::Body> {
    json_request(
        "POST",
        "/assign-rider",
        Some(ADMIN),
        json!({ "parcel_id": parcel_id, "rider_id": rider_id }),
    )
}

#[tokio::test]
async fn failed_rider_update_rolls_back_assignment() {
    let t = app_with_riders(RiderFault::Always).await;
    let parcel = t
        .seed_parcel(ANN_EMAIL, "Dhaka", "Dhaka", 100.0, DeliveryStatus::Pending)
        .await;
    let rider = t.seed_approved_rider("rider@example.com").await;

    let res = t
        .app
        .clone()
        .oneshot(assign_request(parcel.id, rider.id))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("mark rider in-delivery"));
    assert!(message.contains("rolled back"));

    let parcel = t.store.get_parcel(parcel.id).await.unwrap().unwrap();
    assert_eq!(parcel.delivery_status, DeliveryStatus::Pending);
    assert!(parcel.assigned_rider.is_none());
    assert!(parcel.assigned_at.is_none());

    let rider = t.store.get_rider(rider.id).await.unwrap().unwrap();
    assert_eq!(rider.work_status, Some(WorkStatus::Available));
}

#[tokio::test]
async fn assignment_rollback_keeps_a_payment_recorded_meanwhile() {
    let t = app_with_riders(RiderFault::AfterPayment).await;
    let parcel = t
        .seed_parcel(ANN_EMAIL, "Dhaka", "Dhaka", 100.0, DeliveryStatus::Pending)
        .await;
    let rider = t.seed_approved_rider("rider@example.com").await;

    let res = t
        .app
        .clone()
        .oneshot(assign_request(parcel.id, rider.id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let parcel = t.store.get_parcel(parcel.id).await.unwrap().unwrap();
    assert_eq!(parcel.delivery_status, DeliveryStatus::Pending);
    assert!(parcel.assigned_rider.is_none());
    assert_eq!(parcel.payment_status, PaymentStatus::Paid);
    assert!(parcel.paid_at.is_some());
    assert_eq!(t.store.count_payments().await.unwrap(), 1);
}

#[tokio::test]
async fn failed_release_puts_the_parcel_back_in_transit() {
    let t = app_with_riders(RiderFault::OnRelease).await;
    let rider = t.seed_approved_rider("rider@example.com").await;
    let parcel = t
        .seed_parcel(ANN_EMAIL, "Dhaka", "Dhaka", 100.0, DeliveryStatus::Pending)
        .await;
    t.hand_over(parcel.id, &rider, DeliveryStatus::InTransit).await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/parcels/{}/status", parcel.id),
            Some(RIDER),
            json!({ "status": "delivered" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("release rider"));

    let parcel = t.store.get_parcel(parcel.id).await.unwrap().unwrap();
    assert_eq!(parcel.delivery_status, DeliveryStatus::InTransit);
    assert!(parcel.delivered_at.is_none());
    assert_eq!(parcel.rider_email(), Some("rider@example.com"));

    let rider = t.store.get_rider(rider.id).await.unwrap().unwrap();
    assert_eq!(rider.work_status, Some(WorkStatus::InDelivery));
}

#[tokio::test]
async fn failed_role_write_rolls_back_application_review() {
    let store = Arc::new(MemoryStore::new());
    let mut stores = Stores::from_memory(store.clone());
    stores.users = Arc::new(FrozenRoles(store.clone()));
    let t = TestApp::with_stores(store, stores).await;

    seed_user(&t.store, "bob@example.com", Role::User).await;
    let application = t
        .seed_application("bob@example.com", ApplicationStatus::Pending, None)
        .await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/riderApplications/{}/status", application.id),
            Some(ADMIN),
            json!({ "status": "approved" }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("update user role"));
    assert!(message.contains("rolled back"));

    let application = t.store.get_rider(application.id).await.unwrap().unwrap();
    assert_eq!(application.status, ApplicationStatus::Pending);
    assert!(application.work_status.is_none());

    let bob = t
        .store
        .get_user_by_email("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob.role, Role::User);
}

#[tokio::test]
async fn failed_ledger_append_leaves_parcel_unpaid() {
    let store = Arc::new(MemoryStore::new());
    let mut stores = Stores::from_memory(store.clone());
    stores.payments = Arc::new(ClosedLedger(store.clone()));
    let t = TestApp::with_stores(store, stores).await;

    let parcel = t
        .seed_parcel(ANN_EMAIL, "Dhaka", "Sylhet", 250.0, DeliveryStatus::Pending)
        .await;

    let res = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/payments",
            Some(ANN),
            json!({
                "parcel_id": parcel.id,
                "email": ANN_EMAIL,
                "amount": 250.0,
                "transaction_id": "pi_123",
                "payment_method": "card"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("append payment record"));

    let parcel = t.store.get_parcel(parcel.id).await.unwrap().unwrap();
    assert_eq!(parcel.payment_status, PaymentStatus::Unpaid);
    assert!(parcel.paid_at.is_none());
    assert_eq!(t.store.count_payments().await.unwrap(), 0);
}
