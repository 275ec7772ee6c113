use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::Deserialize;

use super::{ApiJson, ApiQuery, parse_id, required, required_text};
use crate::auth::extract::{AdminCaller, Caller, RiderCaller};
use crate::engine::riders::{self, NewApplication};
use crate::error::AppError;
use crate::models::parcel::{DeliveryStatus, Parcel, ParcelFilter};
use crate::models::rider::{ApplicationStatus, RiderApplication, RiderFilter, WorkStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/riderApplications",
            get(list_applications).post(submit_application),
        )
        .route("/riderApplications/:id/status", patch(review_application))
        .route("/riders", get(list_riders))
        .route("/riders/parcels", get(active_parcels))
        .route("/riders/completed-parcels", get(completed_parcels))
}

#[derive(Deserialize)]
pub struct SubmitApplicationRequest {
    pub name: Option<String>,
    pub age: Option<u8>,
    pub phone: Option<String>,
    pub region: Option<String>,
    pub district: Option<String>,
    pub bike_brand: Option<String>,
    pub bike_registration: Option<String>,
    pub nid: Option<String>,
}

#[derive(Deserialize)]
pub struct ApplicationsQuery {
    pub status: Option<ApplicationStatus>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub status: Option<ApplicationStatus>,
}

#[derive(Deserialize)]
pub struct RidersQuery {
    pub district: Option<String>,
    pub work_status: Option<WorkStatus>,
}

async fn submit_application(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiJson(payload): ApiJson<SubmitApplicationRequest>,
) -> Result<(StatusCode, Json<RiderApplication>), AppError> {
    let application = NewApplication {
        name: required_text(payload.name, "name")?,
        email: identity.email,
        age: payload.age,
        phone: required_text(payload.phone, "phone")?,
        region: required_text(payload.region, "region")?,
        district: required_text(payload.district, "district")?,
        bike_brand: required_text(payload.bike_brand, "bike_brand")?,
        bike_registration: required_text(payload.bike_registration, "bike_registration")?,
        nid: required_text(payload.nid, "nid")?,
    };

    let rider = riders::submit_application(&state, application).await?;
    Ok((StatusCode::CREATED, Json(rider)))
}

async fn list_applications(
    State(state): State<Arc<AppState>>,
    AdminCaller(_admin): AdminCaller,
    ApiQuery(query): ApiQuery<ApplicationsQuery>,
) -> Result<Json<Vec<RiderApplication>>, AppError> {
    let applications = state
        .stores
        .riders
        .find_riders(&RiderFilter {
            statuses: query.status.map(|status| vec![status]),
            ..Default::default()
        })
        .await?;

    Ok(Json(applications))
}

async fn review_application(
    State(state): State<Arc<AppState>>,
    AdminCaller(_admin): AdminCaller,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<ReviewRequest>,
) -> Result<Json<RiderApplication>, AppError> {
    let id = parse_id(&id, "rider application")?;
    let status = required(payload.status, "status")?;
    let rider = riders::review_application(&state, id, status).await?;
    Ok(Json(rider))
}

/// Approved riders, for the assignment screen.
async fn list_riders(
    State(state): State<Arc<AppState>>,
    AdminCaller(_admin): AdminCaller,
    ApiQuery(query): ApiQuery<RidersQuery>,
) -> Result<Json<Vec<RiderApplication>>, AppError> {
    let riders = state
        .stores
        .riders
        .find_riders(&RiderFilter {
            statuses: Some(vec![ApplicationStatus::Approved]),
            district: query.district,
            work_status: query.work_status,
            ..Default::default()
        })
        .await?;

    Ok(Json(riders))
}

async fn active_parcels(
    State(state): State<Arc<AppState>>,
    RiderCaller(identity): RiderCaller,
) -> Result<Json<Vec<Parcel>>, AppError> {
    rider_parcels(
        &state,
        identity.email,
        vec![DeliveryStatus::RiderAssigned, DeliveryStatus::InTransit],
    )
    .await
}

async fn completed_parcels(
    State(state): State<Arc<AppState>>,
    RiderCaller(identity): RiderCaller,
) -> Result<Json<Vec<Parcel>>, AppError> {
    rider_parcels(
        &state,
        identity.email,
        vec![
            DeliveryStatus::Delivered,
            DeliveryStatus::ServiceCenterDelivered,
        ],
    )
    .await
}

async fn rider_parcels(
    state: &AppState,
    email: String,
    statuses: Vec<DeliveryStatus>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let parcels = state
        .stores
        .parcels
        .find_parcels(&ParcelFilter {
            rider_email: Some(email),
            delivery_statuses: Some(statuses),
            ..Default::default()
        })
        .await?;

    Ok(Json(parcels))
}
