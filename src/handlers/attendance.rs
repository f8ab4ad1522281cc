//! Attendance handlers

use axum::{extract::{Path, Query, State}, Json};
use chrono::Utc;
use validator::Validate;

use crate::{AppState, AppResult};
use crate::models::{AttendanceFilter, AttendanceRecord, CheckInResponse, LocationRequest};

/// Attendance login with spoof screening and geofence containment
pub async fn check_in(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<CheckInResponse>> {
    req.validate()?;

    let (user_id, input) = req.into_parts();
    let record = state.service.check_in(&user_id, input).await?;

    Ok(Json(CheckInResponse {
        is_out_of_range: record.is_out_of_range,
        record,
        server_time: Utc::now().timestamp(),
    }))
}

/// Recent attendance for a user
pub async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(filter): Query<AttendanceFilter>,
) -> AppResult<Json<Vec<AttendanceRecord>>> {
    let records = state.service.list_attendance(&user_id, filter.limit).await?;
    Ok(Json(records))
}
