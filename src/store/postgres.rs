//! PostgreSQL store
//!
//! Thin adapter from the store traits to the model queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{AttendanceLog, GeofenceRegistry, HistoryStore, StoreResult};
use crate::geo::{GeoFence, GeoPoint};
use crate::models::{AttendanceRecord, LocationRecord, NewAttendance, Office};
use crate::spoof::LocationSample;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    async fn latest_sample(&self, user_id: &str) -> StoreResult<Option<LocationSample>> {
        let record = LocationRecord::latest_for_user(&self.pool, user_id).await?;
        Ok(record.map(LocationSample::from))
    }

    async fn samples_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<LocationSample>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = LocationRecord::recent_for_user(&self.pool, user_id, since, limit).await?;
        Ok(records.into_iter().map(LocationSample::from).collect())
    }

    async fn append(&self, sample: &LocationSample) -> StoreResult<()> {
        let record = LocationRecord::insert(&self.pool, sample).await?;
        tracing::debug!("Location {} stored for user {}", record.id, record.user_id);
        Ok(())
    }
}

#[async_trait]
impl GeofenceRegistry for PgStore {
    async fn list_fences(&self) -> StoreResult<Vec<GeoFence>> {
        let offices = Office::list_active(&self.pool).await?;
        Ok(offices.into_iter().map(GeoFence::from).collect())
    }

    async fn add_fence(&self, name: &str, center: GeoPoint, radius_meters: f64) -> StoreResult<GeoFence> {
        let office = Office::create(&self.pool, name, center, radius_meters).await?;
        Ok(office.into())
    }
}

#[async_trait]
impl AttendanceLog for PgStore {
    async fn record(&self, entry: NewAttendance) -> StoreResult<AttendanceRecord> {
        let mut tx = self.pool.begin().await?;
        let location = LocationRecord::insert(&mut *tx, &entry.sample).await?;
        let record = AttendanceRecord::create(&mut *tx, &entry).await?;
        tx.commit().await?;

        tracing::debug!(
            "Attendance {} stored for user {} (location {})",
            record.id, record.user_id, location.id
        );
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<AttendanceRecord>> {
        Ok(AttendanceRecord::list_for_user(&self.pool, user_id, limit).await?)
    }
}
