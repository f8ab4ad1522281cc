//! Office (geofence) handlers

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{AppState, AppResult};
use crate::geo::{GeoFence, GeoPoint};
use crate::models::CreateOffice;

pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<GeoFence>>> {
    let fences = state.service.list_fences().await?;
    Ok(Json(fences))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateOffice>,
) -> AppResult<(StatusCode, Json<GeoFence>)> {
    req.validate()?;

    let center = GeoPoint::new(req.latitude, req.longitude);
    let fence = state.service.add_fence(&req.name, center, req.radius_meters).await?;
    Ok((StatusCode::CREATED, Json(fence)))
}
