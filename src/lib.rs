//! Attendance Guard
//!
//! GPS attendance integrity: geodesic distance, geofence containment and
//! multi-layer GPS spoof detection, served over a small HTTP API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ATTENDANCE GUARD                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────┐   ┌────────────────┐ │
//! │  │  API      │──▶│ AttendanceService│──▶│ SpoofDetector  │ │
//! │  │  (Axum)   │   │ (per-user locks) │   │ speed/accuracy │ │
//! │  └───────────┘   └────────┬─────────┘   │ /teleport      │ │
//! │                           │             └───────┬────────┘ │
//! │                           ▼                     ▼          │
//! │                ┌─────────────────────┐   ┌────────────┐    │
//! │                │ Store traits        │   │ geo        │    │
//! │                │ (PostgreSQL/memory) │   │ (Haversine)│    │
//! │                └─────────────────────┘   └────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod db;
pub mod geo;
pub mod spoof;
pub mod store;
pub mod attendance;
pub mod models;
pub mod handlers;
pub mod error;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use attendance::AttendanceService;
pub use config::Config;
pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AttendanceService>,
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Attendance
        .route("/api/v1/attendance/check-in", post(handlers::attendance::check_in))
        .route("/api/v1/attendance/:user_id", get(handlers::attendance::list))

        // Location tracking
        .route("/api/v1/locations", post(handlers::locations::track))
        .route("/api/v1/spoof/check", post(handlers::locations::spoof_check))

        // Geofences
        .route("/api/v1/offices", get(handlers::offices::list).post(handlers::offices::create))

        .fallback(handlers::health::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
