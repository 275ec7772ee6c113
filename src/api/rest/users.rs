use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{ApiJson, ApiQuery, parse_id, required, required_text};
use crate::auth::extract::{AdminCaller, Caller};
use crate::engine::riders;
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;
use crate::store::StoreError;

const SEARCH_LIMIT: usize = 10;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/search", get(search_users))
        // GET takes an email, PATCH a user id
        .route("/users/:key/role", get(get_role).patch(set_role))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub inserted: bool,
    pub user: User,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct SetRoleRequest {
    pub role: Option<Role>,
}

#[derive(Serialize)]
pub struct RoleResponse {
    pub email: String,
    pub role: Role,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let email = required_text(payload.email, "email")?;
    if !email.eq_ignore_ascii_case(&identity.email) {
        return Err(AppError::Forbidden(
            "users can only register their own email".to_string(),
        ));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: email.clone(),
        name: payload.name.or(identity.name),
        role: Role::User,
        created_at: now,
        last_log_in: now,
    };

    match state.stores.users.insert_user(user).await {
        Ok(user) => {
            info!(email = %user.email, "user registered");
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    inserted: true,
                    user,
                }),
            ))
        }
        Err(StoreError::Conflict(_)) => {
            let user = state.stores.users.touch_login(&email).await?;
            Ok((
                StatusCode::OK,
                Json(RegisterResponse {
                    inserted: false,
                    user,
                }),
            ))
        }
        Err(err) => Err(err.into()),
    }
}

async fn search_users(
    State(state): State<Arc<AppState>>,
    AdminCaller(_admin): AdminCaller,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let fragment = required_text(query.email, "email")?;
    let users = state
        .stores
        .users
        .search_users(&fragment, SEARCH_LIMIT)
        .await?;
    Ok(Json(users))
}

async fn get_role(
    State(state): State<Arc<AppState>>,
    Caller(_identity): Caller,
    Path(email): Path<String>,
) -> Result<Json<RoleResponse>, AppError> {
    let user = state
        .stores
        .users
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {email} not found")))?;

    Ok(Json(RoleResponse {
        email: user.email,
        role: user.role,
    }))
}

async fn set_role(
    State(state): State<Arc<AppState>>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<SetRoleRequest>,
) -> Result<Json<User>, AppError> {
    let id = parse_id(&id, "user")?;
    let role = required(payload.role, "role")?;

    let user = riders::change_role(&state, id, role).await?;
    info!(
        email = %user.email,
        role = role.as_str(),
        by = %admin.email,
        "user role changed"
    );
    Ok(Json(user))
}
