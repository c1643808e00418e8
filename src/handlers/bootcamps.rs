// handlers/bootcamps.rs - /api/v1/bootcamps handlers

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use super::parse_id;
use crate::api::advanced_results::advanced_results;
use crate::database::models::bootcamp::{self, Bootcamp, CreateBootcamp, UpdateBootcamp};
use crate::database::BOOTCAMPS;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// Mean Earth radius in kilometres, used to turn distances into radians
pub const EARTH_RADIUS_KM: f64 = 6378.1;

/// GET /api/v1/bootcamps - filtered, sorted, paginated list
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<ApiResponse<Vec<Value>>, ApiError> {
    advanced_results(&state.repository(&BOOTCAMPS), &params, &state.config.filter).await
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<Bootcamp>, ApiError> {
    let uuid = parse_id(&BOOTCAMPS, &id)?;
    let row = state
        .repository(&BOOTCAMPS)
        .find_by_id(uuid)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(BOOTCAMPS.resource, &id))?;
    Ok(ApiResponse::success(Bootcamp::from_row(row)?))
}

/// POST /api/v1/bootcamps - slug and location are derived before the insert
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateBootcamp>, JsonRejection>,
) -> Result<ApiResponse<Bootcamp>, ApiError> {
    let Json(input) = payload?;
    let row = bootcamp::prepare_create(input, state.geocoder.as_ref()).await?;
    let created = state.repository(&BOOTCAMPS).insert(&row).await?;

    let bootcamp = Bootcamp::from_row(created)?;
    tracing::info!(id = %bootcamp.id, slug = %bootcamp.slug, "Bootcamp created");
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /api/v1/bootcamps/:id - partial update
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBootcamp>, JsonRejection>,
) -> Result<ApiResponse<Bootcamp>, ApiError> {
    let uuid = parse_id(&BOOTCAMPS, &id)?;
    let Json(input) = payload?;
    let row = bootcamp::prepare_update(input, state.geocoder.as_ref()).await?;
    let updated = state
        .repository(&BOOTCAMPS)
        .update_by_id(uuid, &row)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(BOOTCAMPS.resource, &id))?;
    Ok(ApiResponse::success(Bootcamp::from_row(updated)?))
}

/// DELETE /api/v1/bootcamps/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse<Value>, ApiError> {
    let uuid = parse_id(&BOOTCAMPS, &id)?;
    if !state.repository(&BOOTCAMPS).delete_by_id(uuid).await? {
        return Err(ApiError::resource_not_found(BOOTCAMPS.resource, &id));
    }
    tracing::info!(id = %uuid, "Bootcamp deleted");
    Ok(ApiResponse::success(json!({})))
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance - distance in kilometres
pub async fn in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<ApiResponse<Vec<Value>>, ApiError> {
    let distance: f64 = distance
        .trim()
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request("Distance must be a non-negative number of kilometres"))?;

    let centre = bootcamp::locate(state.geocoder.as_ref(), &zipcode).await?;
    let [lng, lat] = centre.coordinates;

    let filter = FilterData {
        where_clause: Some(radius_filter(lng, lat, distance)),
        ..Default::default()
    };
    let data = state.repository(&BOOTCAMPS).select_any(filter).await?;
    let count = data.len() as i64;
    Ok(ApiResponse::success(data).with_count(count))
}

fn radius_filter(lng: f64, lat: f64, distance_km: f64) -> Value {
    json!({
        "location": { "$geoWithin": { "$centerSphere": [[lng, lat], distance_km / EARTH_RADIUS_KM] } }
    })
}
