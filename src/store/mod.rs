//! Store Module
//!
//! Read/write seams the core depends on. The core never owns storage;
//! it talks to these traits.
//!
//! ## Structure
//! - `HistoryStore`: persisted location samples per user
//! - `GeofenceRegistry`: registered office fences
//! - `AttendanceLog`: accepted attendance records (each written together
//!   with its location sample)
//! - `memory`: in-process implementation (tests, local runs)
//! - `postgres`: PostgreSQL implementation

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::geo::{GeoFence, GeoPoint};
use crate::models::{AttendanceRecord, NewAttendance};
use crate::spoof::LocationSample;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Most recent sample for the user, if any
    async fn latest_sample(&self, user_id: &str) -> StoreResult<Option<LocationSample>>;

    /// Samples with `timestamp >= since`, newest first, at most `limit`
    async fn samples_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<LocationSample>>;

    async fn append(&self, sample: &LocationSample) -> StoreResult<()>;
}

#[async_trait]
pub trait GeofenceRegistry: Send + Sync {
    async fn list_fences(&self) -> StoreResult<Vec<GeoFence>>;

    async fn add_fence(&self, name: &str, center: GeoPoint, radius_meters: f64) -> StoreResult<GeoFence>;
}

#[async_trait]
pub trait AttendanceLog: Send + Sync {
    /// Persist the record and append its sample to history as one unit:
    /// either both are stored or neither is.
    async fn record(&self, entry: NewAttendance) -> StoreResult<AttendanceRecord>;

    /// Newest first
    async fn list_for_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<AttendanceRecord>>;
}

/// Everything the attendance workflow needs from one backend
pub trait AttendanceBackend: HistoryStore + GeofenceRegistry + AttendanceLog {}

impl<T: HistoryStore + GeofenceRegistry + AttendanceLog> AttendanceBackend for T {}
