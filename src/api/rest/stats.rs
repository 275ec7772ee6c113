use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use super::{ApiQuery, required};
use crate::auth::extract::{Caller, stored_user};
use crate::auth::policy::can_act_for;
use crate::engine::earnings::compute_stats;
use crate::error::AppError;
use crate::models::parcel::ParcelFilter;
use crate::models::stats::{ParcelStats, StatsRole};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(stats))
}

#[derive(Deserialize)]
pub struct StatsQuery {
    pub role: Option<StatsRole>,
    pub email: Option<String>,
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiQuery(query): ApiQuery<StatsQuery>,
) -> Result<Json<ParcelStats>, AppError> {
    let role = required(query.role, "role")?;
    let email = query.email.unwrap_or_else(|| identity.email.clone());

    let stored = stored_user(&state, &identity).await?;
    if !can_act_for(&identity, stored.as_ref(), &email) {
        return Err(AppError::Forbidden(
            "cannot read another user's stats".to_string(),
        ));
    }

    let filter = match role {
        StatsRole::User => ParcelFilter {
            sender_email: Some(email),
            ..Default::default()
        },
        StatsRole::Rider => ParcelFilter {
            rider_email: Some(email),
            ..Default::default()
        },
    };

    let parcels = state.stores.parcels.find_parcels(&filter).await?;
    Ok(Json(compute_stats(&parcels)))
}
