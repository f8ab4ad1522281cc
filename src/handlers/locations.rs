//! Location tracking handlers

use axum::{extract::State, Json};
use chrono::Utc;
use validator::Validate;

use crate::{AppState, AppResult};
use crate::models::{LocationRequest, TrackResponse};
use crate::spoof::SpoofVerdict;

/// Periodic location sample
pub async fn track(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<TrackResponse>> {
    req.validate()?;

    let (user_id, input) = req.into_parts();
    let verdict = state.service.track(&user_id, input).await?;

    Ok(Json(TrackResponse {
        accepted: !verdict.is_spoofed,
        verdict,
        server_time: Utc::now().timestamp(),
    }))
}

/// Spoof verdict without persisting anything
pub async fn spoof_check(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<SpoofVerdict>> {
    req.validate()?;

    let (user_id, input) = req.into_parts();
    let verdict = state.service.check(&user_id, input).await?;
    Ok(Json(verdict))
}
