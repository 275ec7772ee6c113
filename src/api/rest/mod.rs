pub mod parcels;
pub mod payments;
pub mod riders;
pub mod stats;
pub mod tracking;
pub mod users;
pub mod ws;

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(parcels::router())
        .merge(riders::router())
        .merge(users::router())
        .merge(tracking::router())
        .merge(payments::router())
        .merge(stats::router())
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/tracking/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// JSON body whose rejection is reported as a JSON `400`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejection is reported as a JSON `400`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("invalid {what} id: {raw}")))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Parcel Delivery Server is Running" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    parcels: usize,
    riders: usize,
    users: usize,
    payments: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    Ok(Json(HealthResponse {
        status: "ok",
        parcels: state.stores.parcels.count_parcels().await?,
        riders: state.stores.riders.count_riders().await?,
        users: state.stores.users.count_users().await?,
        payments: state.stores.payments.count_payments().await?,
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => AppError::Internal(err).into_response(),
    }
}
