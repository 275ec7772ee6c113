use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use super::{ApiJson, ApiQuery, parse_id, required, required_text};
use crate::auth::extract::{AdminCaller, Caller, RiderCaller, stored_user};
use crate::auth::policy::{Decision, authorize, can_act_for};
use crate::engine::dispatch::{self, Assignment};
use crate::error::AppError;
use crate::models::parcel::{
    DeliveryStatus, Parcel, ParcelFilter, PaymentStatus, generate_tracking_id,
};
use crate::models::stats::StatusCount;
use crate::models::user::Role;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", get(list_parcels).post(create_parcel))
        .route("/parcels/delivery/status-count", get(status_counts))
        .route("/parcels/:id", get(get_parcel).delete(delete_parcel))
        .route("/parcels/:id/status", patch(update_status))
        .route("/parcels/:id/cashout", patch(cash_out))
        .route("/assign-rider", post(assign_rider))
}

#[derive(Deserialize)]
pub struct ListParcelsQuery {
    pub email: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub delivery_status: Option<DeliveryStatus>,
}

#[derive(Deserialize)]
pub struct CreateParcelRequest {
    pub tracking_id: Option<String>,
    pub title: Option<String>,
    pub parcel_type: Option<String>,
    pub weight: Option<f64>,
    pub sender_name: Option<String>,
    pub sender_contact: Option<String>,
    #[serde(rename = "senderRegion")]
    pub sender_region: Option<String>,
    pub sender_address: Option<String>,
    pub receiver_name: Option<String>,
    pub receiver_contact: Option<String>,
    #[serde(rename = "receiverRegion")]
    pub receiver_region: Option<String>,
    pub receiver_address: Option<String>,
    pub total_cost: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<DeliveryStatus>,
}

#[derive(Deserialize)]
pub struct AssignRiderRequest {
    pub parcel_id: Option<Uuid>,
    pub rider_id: Option<Uuid>,
}

/// Admins see every parcel; everyone else only their own.
async fn list_parcels(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiQuery(query): ApiQuery<ListParcelsQuery>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let stored = stored_user(&state, &identity).await?;
    let is_admin = authorize(&identity, stored.as_ref(), Role::Admin) == Decision::Allow;

    let sender_email = match query.email {
        Some(email) if is_admin || email.eq_ignore_ascii_case(&identity.email) => Some(email),
        Some(_) => {
            return Err(AppError::Forbidden(
                "cannot list parcels of another user".to_string(),
            ))
        }
        None if is_admin => None,
        None => Some(identity.email.clone()),
    };

    let parcels = state
        .stores
        .parcels
        .find_parcels(&ParcelFilter {
            sender_email,
            delivery_statuses: query.delivery_status.map(|status| vec![status]),
            payment_status: query.payment_status,
            ..Default::default()
        })
        .await?;

    Ok(Json(parcels))
}

async fn create_parcel(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiJson(payload): ApiJson<CreateParcelRequest>,
) -> Result<(StatusCode, Json<Parcel>), AppError> {
    let total_cost = required(payload.total_cost, "total_cost")?;
    if !total_cost.is_finite() || total_cost < 0.0 {
        return Err(AppError::BadRequest(
            "total_cost must be a non-negative number".to_string(),
        ));
    }

    let now = Utc::now();
    let parcel = Parcel {
        id: Uuid::new_v4(),
        tracking_id: payload
            .tracking_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| generate_tracking_id(now)),
        title: required_text(payload.title, "title")?,
        parcel_type: payload
            .parcel_type
            .unwrap_or_else(|| "document".to_string()),
        weight: payload.weight,
        sender_email: identity.email,
        sender_name: required_text(payload.sender_name, "sender_name")?,
        sender_contact: required_text(payload.sender_contact, "sender_contact")?,
        sender_region: required_text(payload.sender_region, "senderRegion")?,
        sender_address: payload.sender_address,
        receiver_name: required_text(payload.receiver_name, "receiver_name")?,
        receiver_contact: required_text(payload.receiver_contact, "receiver_contact")?,
        receiver_region: required_text(payload.receiver_region, "receiverRegion")?,
        receiver_address: payload.receiver_address,
        total_cost,
        delivery_status: DeliveryStatus::Pending,
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

    let parcel = state.stores.parcels.insert_parcel(parcel).await?;
    info!(parcel_id = %parcel.id, tracking_id = %parcel.tracking_id, "parcel created");

    Ok((StatusCode::CREATED, Json(parcel)))
}

async fn get_parcel(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    let id = parse_id(&id, "parcel")?;
    let parcel = dispatch::load_parcel(&state, id).await?;

    let is_rider = parcel
        .rider_email()
        .is_some_and(|email| email.eq_ignore_ascii_case(&identity.email));
    if !is_rider {
        let stored = stored_user(&state, &identity).await?;
        if !can_act_for(&identity, stored.as_ref(), &parcel.sender_email) {
            return Err(AppError::Forbidden(
                "only the sender, the assigned rider or an admin can read a parcel".to_string(),
            ));
        }
    }

    Ok(Json(parcel))
}

async fn delete_parcel(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, "parcel")?;
    let parcel = dispatch::load_parcel(&state, id).await?;

    let stored = stored_user(&state, &identity).await?;
    if !can_act_for(&identity, stored.as_ref(), &parcel.sender_email) {
        return Err(AppError::Forbidden(
            "only the sender or an admin can delete a parcel".to_string(),
        ));
    }

    if !state.stores.parcels.delete_parcel(id).await? {
        return Err(AppError::NotFound(format!("parcel {id} not found")));
    }

    info!(parcel_id = %id, by = %identity.email, "parcel deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Parcel deleted successfully"
    })))
}

async fn status_counts(
    State(state): State<Arc<AppState>>,
    AdminCaller(_admin): AdminCaller,
) -> Result<Json<Vec<StatusCount>>, AppError> {
    let parcels = state
        .stores
        .parcels
        .find_parcels(&ParcelFilter::default())
        .await?;

    let counts = DeliveryStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: status.as_str().to_string(),
            count: parcels
                .iter()
                .filter(|parcel| parcel.delivery_status == *status)
                .count(),
        })
        .collect();

    Ok(Json(counts))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    RiderCaller(identity): RiderCaller,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateStatusRequest>,
) -> Result<Json<Parcel>, AppError> {
    let id = parse_id(&id, "parcel")?;
    let status = required(payload.status, "status")?;
    let parcel = dispatch::update_delivery_status(&state, &identity, id, status).await?;
    Ok(Json(parcel))
}

async fn cash_out(
    State(state): State<Arc<AppState>>,
    RiderCaller(identity): RiderCaller,
    Path(id): Path<String>,
) -> Result<Json<Parcel>, AppError> {
    let id = parse_id(&id, "parcel")?;
    let parcel = dispatch::cash_out(&state, &identity, id).await?;
    Ok(Json(parcel))
}

async fn assign_rider(
    State(state): State<Arc<AppState>>,
    AdminCaller(_admin): AdminCaller,
    ApiJson(payload): ApiJson<AssignRiderRequest>,
) -> Result<Json<Assignment>, AppError> {
    let parcel_id = required(payload.parcel_id, "parcel_id")?;
    let rider_id = required(payload.rider_id, "rider_id")?;
    let assignment = dispatch::assign_rider(&state, parcel_id, rider_id).await?;
    Ok(Json(assignment))
}
