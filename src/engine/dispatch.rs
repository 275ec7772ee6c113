use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::Identity;
use crate::engine::lifecycle::{TransitionSource, check_transition, is_terminal};
use crate::engine::saga::Saga;
use crate::error::AppError;
use crate::models::parcel::{AssignedRider, DeliveryStatus, Parcel, ParcelPatch};
use crate::models::rider::{ApplicationStatus, RiderApplication, WorkStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub parcel: Parcel,
    pub rider: RiderApplication,
}

/// Moves a pending parcel to `rider_assigned` and marks the rider busy.
///
/// The availability check and the two writes are not atomic with respect to
/// a concurrent assignment of the same rider.
pub async fn assign_rider(
    state: &AppState,
    parcel_id: Uuid,
    rider_id: Uuid,
) -> Result<Assignment, AppError> {
    let result = try_assign(state, parcel_id, rider_id).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::Internal(_)) => "error",
        Err(_) => "rejected",
    };
    state
        .metrics
        .rider_assignments_total
        .with_label_values(&[outcome])
        .inc();

    result
}

async fn try_assign(
    state: &AppState,
    parcel_id: Uuid,
    rider_id: Uuid,
) -> Result<Assignment, AppError> {
    let parcel = load_parcel(state, parcel_id).await?;
    check_transition(
        parcel.delivery_status,
        DeliveryStatus::RiderAssigned,
        TransitionSource::Assignment,
    )
    .map_err(AppError::Conflict)?;

    let rider = state
        .stores
        .riders
        .get_rider(rider_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

    if rider.status != ApplicationStatus::Approved {
        return Err(AppError::Conflict(format!("rider {rider_id} is not approved")));
    }
    if rider.is_busy() {
        return Err(AppError::Conflict(format!(
            "rider {rider_id} is already in delivery"
        )));
    }

    let now = Utc::now();
    let mut saga = Saga::new("assign_rider");

    let assigned = state
        .stores
        .parcels
        .update_parcel(
            parcel.id,
            ParcelPatch {
                delivery_status: Some(DeliveryStatus::RiderAssigned),
                assigned_rider: Some(Some(AssignedRider {
                    id: rider.id,
                    name: rider.name.clone(),
                    email: rider.email.clone(),
                })),
                assigned_at: Some(Some(now)),
                ..Default::default()
            },
        )
        .await?;

    let parcels = state.stores.parcels.clone();
    let restore = ParcelPatch::undo_assignment(&parcel);
    saga.completed("assign parcel", async move {
        parcels.update_parcel(parcel_id, restore).await.map(|_| ())
    });

    let rider = match state
        .stores
        .riders
        .set_work_status(rider.id, WorkStatus::InDelivery)
        .await
    {
        Ok(rider) => rider,
        Err(err) => return Err(saga.abort("mark rider in-delivery", err, &state.metrics).await),
    };

    state.metrics.riders_in_delivery.inc();
    info!(
        parcel_id = %assigned.id,
        rider_id = %rider.id,
        tracking_id = %assigned.tracking_id,
        "rider assigned"
    );

    Ok(Assignment {
        parcel: assigned,
        rider,
    })
}

/// Generic status update for the assigned rider. Finishing a delivery frees
/// the rider; if that write fails the parcel status is put back.
pub async fn update_delivery_status(
    state: &AppState,
    caller: &Identity,
    parcel_id: Uuid,
    to: DeliveryStatus,
) -> Result<Parcel, AppError> {
    let parcel = load_parcel(state, parcel_id).await?;
    ensure_assigned_to(&parcel, caller)?;
    check_transition(parcel.delivery_status, to, TransitionSource::StatusUpdate)
        .map_err(AppError::Conflict)?;

    let now = Utc::now();
    let mut patch = ParcelPatch {
        delivery_status: Some(to),
        ..Default::default()
    };
    match to {
        DeliveryStatus::InTransit => patch.picked_at = Some(Some(now)),
        DeliveryStatus::Delivered | DeliveryStatus::ServiceCenterDelivered => {
            patch.delivered_at = Some(Some(now))
        }
        DeliveryStatus::Pending | DeliveryStatus::RiderAssigned => {}
    }

    let mut saga = Saga::new("update_delivery_status");
    let updated = state.stores.parcels.update_parcel(parcel.id, patch).await?;

    if let (true, Some(rider)) = (is_terminal(to), parcel.assigned_rider.as_ref()) {
        let parcels = state.stores.parcels.clone();
        let restore = ParcelPatch::undo_status_update(&parcel);
        saga.completed("update parcel status", async move {
            parcels.update_parcel(parcel_id, restore).await.map(|_| ())
        });

        if let Err(err) = state
            .stores
            .riders
            .set_work_status(rider.id, WorkStatus::Available)
            .await
        {
            return Err(saga.abort("release rider", err, &state.metrics).await);
        }

        state.metrics.riders_in_delivery.dec();
        info!(parcel_id = %parcel.id, rider_id = %rider.id, "rider released");
    }

    info!(
        parcel_id = %updated.id,
        from = parcel.delivery_status.as_str(),
        to = to.as_str(),
        "delivery status updated"
    );

    Ok(updated)
}

pub async fn cash_out(state: &AppState, caller: &Identity, parcel_id: Uuid) -> Result<Parcel, AppError> {
    let parcel = load_parcel(state, parcel_id).await?;
    ensure_assigned_to(&parcel, caller)?;

    if !parcel.delivery_status.is_delivered() {
        return Err(AppError::Conflict(format!("parcel {parcel_id} is not delivered yet")));
    }
    if parcel.is_cashed_out {
        return Err(AppError::Conflict(format!("parcel {parcel_id} is already cashed out")));
    }

    let updated = state
        .stores
        .parcels
        .update_parcel(
            parcel.id,
            ParcelPatch {
                is_cashed_out: Some(true),
                cashed_out_at: Some(Some(Utc::now())),
                ..Default::default()
            },
        )
        .await?;

    info!(parcel_id = %updated.id, rider = %caller.email, "parcel cashed out");
    Ok(updated)
}

pub(crate) async fn load_parcel(state: &AppState, parcel_id: Uuid) -> Result<Parcel, AppError> {
    state
        .stores
        .parcels
        .get_parcel(parcel_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("parcel {parcel_id} not found")))
}

fn ensure_assigned_to(parcel: &Parcel, caller: &Identity) -> Result<(), AppError> {
    match parcel.rider_email() {
        Some(email) if email.eq_ignore_ascii_case(&caller.email) => Ok(()),
        _ => Err(AppError::Forbidden(format!(
            "parcel {} is not assigned to caller",
            parcel.id
        ))),
    }
}
