#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use parcel_dispatch::api::rest::router;
use parcel_dispatch::auth::verifier::StaticIdentityVerifier;
use parcel_dispatch::gateway::StaticPaymentGateway;
use parcel_dispatch::models::parcel::{
    AssignedRider, DeliveryStatus, Parcel, ParcelPatch, PaymentStatus,
};
use parcel_dispatch::models::rider::{ApplicationStatus, RiderApplication, WorkStatus};
use parcel_dispatch::models::user::{Role, User};
use parcel_dispatch::state::AppState;
use parcel_dispatch::store::memory::MemoryStore;
use parcel_dispatch::store::{ParcelStore, RiderStore, Stores, UserStore};

pub const ADMIN: &str = "admin-token";
pub const ANN: &str = "ann-token";
pub const BOB: &str = "bob-token";
pub const RIDER: &str = "rider-token";
pub const OTHER_RIDER: &str = "other-rider-token";

pub const ANN_EMAIL: &str = "ann@example.com";

pub struct TestApp {
    pub app: Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<StaticPaymentGateway>,
}

impl TestApp {
    /// Seeds an admin and one plain user (Ann). Bob and the riders start
    /// without user records.
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_stores(store.clone(), Stores::from_memory(store)).await
    }

    pub async fn with_stores(store: Arc<MemoryStore>, stores: Stores) -> Self {
        seed_user(&store, "admin@example.com", Role::Admin).await;
        seed_user(&store, ANN_EMAIL, Role::User).await;

        let identity = StaticIdentityVerifier::new()
            .with_token(ADMIN, "admin@example.com")
            .with_token(ANN, ANN_EMAIL)
            .with_token(BOB, "bob@example.com")
            .with_token(RIDER, "rider@example.com")
            .with_token(OTHER_RIDER, "other-rider@example.com");

        let gateway = Arc::new(StaticPaymentGateway::new());
        let state = Arc::new(AppState::new(
            stores,
            Arc::new(identity),
            gateway.clone(),
            "usd",
            64,
        ));

        Self {
            app: router(state.clone()),
            state,
            store,
            gateway,
        }
    }

    pub async fn seed_parcel(
        &self,
        sender_email: &str,
        sender_region: &str,
        receiver_region: &str,
        total_cost: f64,
        status: DeliveryStatus,
    ) -> Parcel {
        let now = Utc::now();
        let parcel = Parcel {
            id: Uuid::new_v4(),
            tracking_id: format!("PCL-TEST-{}", Uuid::new_v4().simple()),
            title: "Books".to_string(),
            parcel_type: "non-document".to_string(),
            weight: Some(2.0),
            sender_email: sender_email.to_string(),
            sender_name: "Sender".to_string(),
            sender_contact: "0100".to_string(),
            sender_region: sender_region.to_string(),
            sender_address: None,
            receiver_name: "Receiver".to_string(),
            receiver_contact: "0200".to_string(),
            receiver_region: receiver_region.to_string(),
            receiver_address: None,
            total_cost,
            delivery_status: status,
            payment_status: PaymentStatus::Unpaid,
            assigned_rider: None,
            is_cashed_out: false,
            created_at: now,
            updated_at: now,
            paid_at: None,
            assigned_at: None,
            picked_at: None,
            delivered_at: None,
            cashed_out_at: None,
        };

        self.store.insert_parcel(parcel).await.unwrap()
    }

    /// Approved, available rider plus a user record with the rider role.
    pub async fn seed_approved_rider(&self, email: &str) -> RiderApplication {
        seed_user(&self.store, email, Role::Rider).await;
        self.seed_application(email, ApplicationStatus::Approved, Some(WorkStatus::Available))
            .await
    }

    pub async fn seed_application(
        &self,
        email: &str,
        status: ApplicationStatus,
        work_status: Option<WorkStatus>,
    ) -> RiderApplication {
        let now = Utc::now();
        let rider = RiderApplication {
            id: Uuid::new_v4(),
            name: "Rafi".to_string(),
            email: email.to_string(),
            age: Some(27),
            phone: "0177".to_string(),
            region: "Dhaka".to_string(),
            district: "Dhaka".to_string(),
            bike_brand: "Honda".to_string(),
            bike_registration: "DHA-1234".to_string(),
            nid: "1990123456".to_string(),
            status,
            work_status,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_rider(rider).await.unwrap()
    }

    /// Puts `parcel_id` in the hands of `rider` and marks the rider busy,
    /// bypassing the API.
    pub async fn hand_over(&self, parcel_id: Uuid, rider: &RiderApplication, status: DeliveryStatus) {
        self.store
            .update_parcel(
                parcel_id,
                ParcelPatch {
                    delivery_status: Some(status),
                    assigned_rider: Some(Some(AssignedRider {
                        id: rider.id,
                        name: rider.name.clone(),
                        email: rider.email.clone(),
                    })),
                    assigned_at: Some(Some(Utc::now())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        self.store
            .set_work_status(rider.id, WorkStatus::InDelivery)
            .await
            .unwrap();
    }
}

pub async fn seed_user(store: &MemoryStore, email: &str, role: Role) -> User {
    store
        .insert_user(User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: None,
            role,
            created_at: Utc::now(),
            last_log_in: Utc::now(),
        })
        .await
        .unwrap()
}

pub fn parcel_payload(sender_region: &str, receiver_region: &str, total_cost: f64) -> Value {
    json!({
        "title": "Books",
        "parcel_type": "non-document",
        "weight": 1.5,
        "sender_name": "Ann",
        "sender_contact": "01700000000",
        "senderRegion": sender_region,
        "sender_address": "12 Lake Rd",
        "receiver_name": "Bob",
        "receiver_contact": "01800000000",
        "receiverRegion": receiver_region,
        "receiver_address": "4 Hill St",
        "total_cost": total_cost
    })
}

pub fn application_payload() -> Value {
    json!({
        "name": "Rafi",
        "age": 27,
        "phone": "01711111111",
        "region": "Dhaka",
        "district": "Dhaka",
        "bike_brand": "Honda",
        "bike_registration": "DHA-1234",
        "nid": "1990123456"
    })
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
