//! In-memory store
//!
//! Backs tests and local runs without PostgreSQL.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{AttendanceLog, GeofenceRegistry, HistoryStore, StoreError, StoreResult};
use crate::geo::{GeoFence, GeoPoint};
use crate::models::{AttendanceRecord, NewAttendance};
use crate::spoof::LocationSample;

#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Per-user samples, kept sorted oldest -> newest
    samples: RwLock<HashMap<String, Vec<LocationSample>>>,
    fences: RwLock<Vec<GeoFence>>,
    attendance: RwLock<Vec<AttendanceRecord>>,
    history_unavailable: AtomicBool,
    attendance_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a history outage: reads fail until switched back.
    /// Writes, fences and attendance keep working.
    pub fn set_history_unavailable(&self, unavailable: bool) {
        self.history_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Simulate a failing attendance log: `record` fails and writes nothing.
    pub fn set_attendance_unavailable(&self, unavailable: bool) {
        self.attendance_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seed history directly (insertion keeps timestamp order)
    pub fn push_sample(&self, sample: LocationSample) {
        let mut samples = self.samples.write();
        let history = samples.entry(sample.user_id.clone()).or_default();
        let pos = history.partition_point(|s| s.timestamp <= sample.timestamp);
        history.insert(pos, sample);
    }

    pub fn sample_count(&self, user_id: &str) -> usize {
        self.samples.read().get(user_id).map_or(0, Vec::len)
    }

    fn ensure_history_readable(&self) -> StoreResult<()> {
        if self.history_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("location history switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn latest_sample(&self, user_id: &str) -> StoreResult<Option<LocationSample>> {
        self.ensure_history_readable()?;
        Ok(self
            .samples
            .read()
            .get(user_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn samples_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<LocationSample>> {
        self.ensure_history_readable()?;
        let samples = self.samples.read();
        let Some(history) = samples.get(user_id) else {
            return Ok(Vec::new());
        };

        Ok(history
            .iter()
            .rev()
            .filter(|s| s.timestamp >= since)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn append(&self, sample: &LocationSample) -> StoreResult<()> {
        self.push_sample(sample.clone());
        Ok(())
    }
}

#[async_trait]
impl GeofenceRegistry for MemoryStore {
    async fn list_fences(&self) -> StoreResult<Vec<GeoFence>> {
        Ok(self.fences.read().clone())
    }

    async fn add_fence(&self, name: &str, center: GeoPoint, radius_meters: f64) -> StoreResult<GeoFence> {
        let fence = GeoFence {
            id: Uuid::new_v4(),
            name: name.to_string(),
            center,
            radius_meters,
        };
        self.fences.write().push(fence.clone());
        Ok(fence)
    }
}

#[async_trait]
impl AttendanceLog for MemoryStore {
    async fn record(&self, entry: NewAttendance) -> StoreResult<AttendanceRecord> {
        if self.attendance_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("attendance log switched off".to_string()));
        }

        self.push_sample(entry.sample.clone());
        let record = AttendanceRecord::from_entry(entry);
        self.attendance.write().push(record.clone());
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<AttendanceRecord>> {
        let mut records: Vec<AttendanceRecord> = self
            .attendance
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();

        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(user: &str, ts: DateTime<Utc>) -> LocationSample {
        LocationSample {
            user_id: user.to_string(),
            latitude: 19.0,
            longitude: 72.0,
            accuracy: None,
            timestamp: ts,
            method: "periodic".to_string(),
        }
    }

    #[test]
    fn test_latest_and_window_ordering() {
        let store = MemoryStore::new();
        let now = Utc::now();
        // Inserted out of order on purpose
        for secs in [30, 400, 10, 200, 60, 90, 120] {
            store.push_sample(sample("u1", now - Duration::seconds(secs)));
        }

        let latest = tokio_test::block_on(store.latest_sample("u1")).unwrap().unwrap();
        assert_eq!(latest.timestamp, now - Duration::seconds(10));

        let window = tokio_test::block_on(store.samples_since("u1", now - Duration::seconds(300), 5)).unwrap();
        let ages: Vec<i64> = window.iter().map(|s| (now - s.timestamp).num_seconds()).collect();
        assert_eq!(ages, vec![10, 30, 60, 90, 120]);
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let store = MemoryStore::new();
        assert!(tokio_test::block_on(store.latest_sample("nobody")).unwrap().is_none());
        assert!(tokio_test::block_on(store.samples_since("nobody", Utc::now(), 5)).unwrap().is_empty());
    }

    #[test]
    fn test_history_outage_only_blocks_reads() {
        let store = MemoryStore::new();
        store.set_history_unavailable(true);
        assert!(tokio_test::block_on(store.latest_sample("u1")).is_err());
        assert!(tokio_test::block_on(store.samples_since("u1", Utc::now(), 5)).is_err());
        assert!(tokio_test::block_on(store.append(&sample("u1", Utc::now()))).is_ok());
        assert!(tokio_test::block_on(store.list_fences()).is_ok());

        store.set_history_unavailable(false);
        assert!(tokio_test::block_on(store.latest_sample("u1")).unwrap().is_some());
    }

    #[test]
    fn test_record_writes_sample_and_entry_together() {
        use crate::geo::FenceCheck;

        let store = MemoryStore::new();
        let entry = NewAttendance {
            sample: sample("u1", Utc::now()),
            fence_check: FenceCheck { nearest: None, is_out_of_range: true },
        };

        store.set_attendance_unavailable(true);
        assert!(tokio_test::block_on(store.record(entry.clone())).is_err());
        assert_eq!(store.sample_count("u1"), 0);
        assert!(tokio_test::block_on(store.list_for_user("u1", 10)).unwrap().is_empty());

        store.set_attendance_unavailable(false);
        let record = tokio_test::block_on(store.record(entry)).unwrap();
        assert!(record.is_out_of_range);
        assert_eq!(store.sample_count("u1"), 1);
        assert_eq!(tokio_test::block_on(store.list_for_user("u1", 10)).unwrap().len(), 1);
    }
}
