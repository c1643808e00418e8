// handlers/users.rs - /api/v1/auth/users handlers (admin only)

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use super::parse_id;
use crate::api::advanced_results::advanced_results;
use crate::database::models::user::{self, CreateUser, UpdateUser, User};
use crate::database::USERS;
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/auth/users
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<ApiResponse<Vec<Value>>, ApiError> {
    advanced_results(&state.repository(&USERS), &params, &state.config.filter).await
}

/// GET /api/v1/auth/users/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<User>, ApiError> {
    let uuid = parse_id(&USERS, &id)?;
    let row = state
        .repository(&USERS)
        .find_by_id(uuid)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(USERS.resource, &id))?;
    Ok(ApiResponse::success(User::from_row(row)?))
}

/// POST /api/v1/auth/users
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<ApiResponse<User>, ApiError> {
    let Json(input) = payload?;
    let row = user::prepare_create(input).await?;
    let created = User::from_row(state.repository(&USERS).insert(&row).await?)?;
    tracing::info!(id = %created.id, role = %created.role, "User created by admin");
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/auth/users/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<ApiResponse<User>, ApiError> {
    let uuid = parse_id(&USERS, &id)?;
    let Json(input) = payload?;
    let row = user::prepare_update(input).await?;
    let updated = state
        .repository(&USERS)
        .update_by_id(uuid, &row)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(USERS.resource, &id))?;
    Ok(ApiResponse::success(User::from_row(updated)?))
}

/// DELETE /api/v1/auth/users/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<Value>, ApiError> {
    let uuid = parse_id(&USERS, &id)?;
    if !state.repository(&USERS).delete_by_id(uuid).await? {
        return Err(ApiError::resource_not_found(USERS.resource, &id));
    }
    tracing::info!(id = %uuid, "User deleted");
    Ok(ApiResponse::success(json!({})))
}
