use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::{ApiJson, required_text};
use crate::auth::extract::Caller;
use crate::error::AppError;
use crate::models::tracking::TrackingEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tracking", post(append_event))
        .route("/tracking/:tracking_id", get(list_events))
}

#[derive(Deserialize)]
pub struct AppendEventRequest {
    pub tracking_id: Option<String>,
    pub parcel_id: Option<Uuid>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub updated_by: Option<String>,
}

async fn append_event(
    State(state): State<Arc<AppState>>,
    Caller(_identity): Caller,
    ApiJson(payload): ApiJson<AppendEventRequest>,
) -> Result<(StatusCode, Json<TrackingEvent>), AppError> {
    let event = TrackingEvent {
        id: Uuid::new_v4(),
        tracking_id: required_text(payload.tracking_id, "tracking_id")?,
        parcel_id: payload.parcel_id,
        status: required_text(payload.status, "status")?,
        location: required_text(payload.location, "location")?,
        updated_by: required_text(payload.updated_by, "updated_by")?,
        timestamp: Utc::now(),
    };

    let event = state.stores.tracking.append_event(event).await?;

    // no live subscribers is not an error
    if state.tracking_events_tx.send(event.clone()).is_err() {
        debug!(tracking_id = %event.tracking_id, "no live tracking subscribers");
    }

    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    Caller(_identity): Caller,
    Path(tracking_id): Path<String>,
) -> Result<Json<Vec<TrackingEvent>>, AppError> {
    let events = state.stores.tracking.events_for(&tracking_id).await?;
    if events.is_empty() {
        return Err(AppError::NotFound(format!(
            "no tracking events for {tracking_id}"
        )));
    }

    Ok(Json(events))
}
