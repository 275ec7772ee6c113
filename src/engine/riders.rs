use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::engine::saga::Saga;
use crate::error::AppError;
use crate::models::rider::{ApplicationStatus, RiderApplication, RiderFilter, WorkStatus};
use crate::models::user::{Role, User};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub name: String,
    pub email: String,
    pub age: Option<u8>,
    pub phone: String,
    pub region: String,
    pub district: String,
    pub bike_brand: String,
    pub bike_registration: String,
    pub nid: String,
}

/// One open application per email: a pending or approved one blocks another.
pub async fn submit_application(
    state: &AppState,
    application: NewApplication,
) -> Result<RiderApplication, AppError> {
    let open = state
        .stores
        .riders
        .find_riders(&RiderFilter {
            email: Some(application.email.clone()),
            statuses: Some(vec![ApplicationStatus::Pending, ApplicationStatus::Approved]),
            ..Default::default()
        })
        .await?;

    if let Some(existing) = open.first() {
        return Err(AppError::Conflict(format!(
            "{} already has a {} rider application",
            application.email,
            match existing.status {
                ApplicationStatus::Approved => "approved",
                _ => "pending",
            }
        )));
    }

    let now = Utc::now();
    let rider = RiderApplication {
        id: Uuid::new_v4(),
        name: application.name,
        email: application.email,
        age: application.age,
        phone: application.phone,
        region: application.region,
        district: application.district,
        bike_brand: application.bike_brand,
        bike_registration: application.bike_registration,
        nid: application.nid,
        status: ApplicationStatus::Pending,
        work_status: None,
        created_at: now,
        updated_at: now,
    };

    let rider = state.stores.riders.insert_rider(rider).await?;
    info!(rider_id = %rider.id, email = %rider.email, "rider application submitted");
    Ok(rider)
}

/// Admin decision on an application. Approval grants the `rider` role and
/// makes the rider available. Any other decision takes the role away unless
/// another application for the same email is still approved.
pub async fn review_application(
    state: &AppState,
    id: Uuid,
    status: ApplicationStatus,
) -> Result<RiderApplication, AppError> {
    if status == ApplicationStatus::Pending {
        return Err(AppError::BadRequest(
            "status must be approved, rejected or inactive".to_string(),
        ));
    }

    let rider = state
        .stores
        .riders
        .get_rider(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rider application {id} not found")))?;

    if status != ApplicationStatus::Approved && rider.is_busy() {
        return Err(AppError::Conflict(format!(
            "rider {id} has an active delivery"
        )));
    }

    let user = state
        .stores
        .users
        .get_user_by_email(&rider.email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no user account for {}", rider.email)))?;

    let applications = state
        .stores
        .riders
        .find_riders(&RiderFilter {
            email: Some(rider.email.clone()),
            ..Default::default()
        })
        .await?;
    let approved_elsewhere = applications
        .iter()
        .any(|other| other.id != id && other.status == ApplicationStatus::Approved);

    let target_role = match (status, user.role) {
        (_, Role::Admin) => Role::Admin,
        (ApplicationStatus::Approved, _) => Role::Rider,
        _ if approved_elsewhere => Role::Rider,
        _ => Role::User,
    };
    if user.role == Role::Rider
        && target_role != Role::Rider
        && applications.iter().any(RiderApplication::is_busy)
    {
        return Err(AppError::Conflict(format!(
            "{} has an active delivery",
            rider.email
        )));
    }

    let work_status = match status {
        ApplicationStatus::Approved => Some(rider.work_status.unwrap_or(WorkStatus::Available)),
        _ => None,
    };

    let mut saga = Saga::new("review_application");
    let updated = state
        .stores
        .riders
        .update_rider_status(id, status, work_status)
        .await?;

    let riders = state.stores.riders.clone();
    let (previous_status, previous_work) = (rider.status, rider.work_status);
    saga.completed("update application", async move {
        riders
            .update_rider_status(id, previous_status, previous_work)
            .await
            .map(|_| ())
    });

    if user.role != target_role {
        if let Err(err) = state.stores.users.set_role(user.id, target_role).await {
            return Err(saga.abort("update user role", err, &state.metrics).await);
        }
    }

    info!(
        rider_id = %updated.id,
        email = %updated.email,
        role = target_role.as_str(),
        "rider application reviewed"
    );

    Ok(updated)
}

/// Admin role change. A rider with an active delivery keeps the `rider` role
/// until the parcel is finished.
pub async fn change_role(state: &AppState, user_id: Uuid, role: Role) -> Result<User, AppError> {
    let user = state
        .stores
        .users
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    if user.role == Role::Rider && role != Role::Rider {
        let busy = state
            .stores
            .riders
            .find_riders(&RiderFilter {
                email: Some(user.email.clone()),
                work_status: Some(WorkStatus::InDelivery),
                ..Default::default()
            })
            .await?;
        if !busy.is_empty() {
            return Err(AppError::Conflict(format!(
                "{} has an active delivery",
                user.email
            )));
        }
    }

    Ok(state.stores.users.set_role(user.id, role).await?)
}
