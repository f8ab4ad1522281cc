//! Attendance workflow
//!
//! check-in: validate -> spoof screen -> geofence containment -> persist.
//! Spoofed samples are never appended to history. An accepted check-in's
//! sample and attendance record are persisted as one unit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::{Config, HistoryFailurePolicy};
use crate::geo::{self, GeoFence, GeoPoint};
use crate::models::{AttendanceRecord, NewAttendance};
use crate::spoof::{
    evaluate, LocationInput, LocationSample, SpoofDetector, SpoofError, SpoofReason, SpoofVerdict,
};
use crate::store::{AttendanceBackend, AttendanceLog, GeofenceRegistry, HistoryStore, StoreError};

/// Default/maximum page size for attendance listings
pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 500;

/// Prune idle per-user locks once the map grows past this
const LOCK_PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("location rejected: {0}")]
    Spoofed(SpoofReason),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Spoof(#[from] SpoofError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// PER-USER SERIALIZATION
// ============================================================================

/// Keyed async locks so two submissions of one user never see the same
/// stale history snapshot.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            if locks.len() > LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            locks.entry(user_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct AttendanceService {
    history: Arc<dyn HistoryStore>,
    fences: Arc<dyn GeofenceRegistry>,
    log: Arc<dyn AttendanceLog>,
    detector: SpoofDetector,
    policy: HistoryFailurePolicy,
    locks: Option<UserLocks>,
    min_fence_radius_meters: f64,
}

impl AttendanceService {
    pub fn new<B: AttendanceBackend + 'static>(backend: Arc<B>, config: &Config) -> Self {
        let history: Arc<dyn HistoryStore> = backend.clone();
        let fences: Arc<dyn GeofenceRegistry> = backend.clone();
        let log: Arc<dyn AttendanceLog> = backend;

        Self {
            detector: SpoofDetector::with_thresholds(history.clone(), config.spoof.clone()),
            history,
            fences,
            log,
            policy: config.history_failure_policy,
            locks: config.serialize_user_checkins.then(UserLocks::default),
            min_fence_radius_meters: config.min_fence_radius_meters,
        }
    }

    pub fn detector(&self) -> &SpoofDetector {
        &self.detector
    }

    /// Attendance login: reject spoofed samples, otherwise record with
    /// geofence containment.
    pub async fn check_in(&self, user_id: &str, input: LocationInput) -> Result<AttendanceRecord, AttendanceError> {
        let _guard = self.lock_user(user_id).await;

        let sample = input.into_sample(user_id, Utc::now(), self.detector.thresholds().max_clock_skew())?;
        let verdict = self.screen(&sample).await?;
        if let Some(reason) = verdict.reason {
            return Err(AttendanceError::Spoofed(reason));
        }

        let fences = self.fences.list_fences().await?;
        let fence_check = geo::check_fences(&sample.point(), &fences);

        let record = self.log.record(NewAttendance { sample, fence_check }).await?;

        tracing::info!(
            "Attendance recorded for user {} (office: {}, out_of_range: {})",
            record.user_id,
            record.office_name.as_deref().unwrap_or("-"),
            record.is_out_of_range
        );

        Ok(record)
    }

    /// Periodic tracking: append only when genuine. The verdict is returned
    /// either way.
    pub async fn track(&self, user_id: &str, input: LocationInput) -> Result<SpoofVerdict, AttendanceError> {
        let _guard = self.lock_user(user_id).await;

        let input = LocationInput {
            method: input.method.or_else(|| Some("periodic".to_string())),
            ..input
        };
        let sample = input.into_sample(user_id, Utc::now(), self.detector.thresholds().max_clock_skew())?;
        let verdict = self.screen(&sample).await?;

        if !verdict.is_spoofed {
            self.history.append(&sample).await?;
        }
        Ok(verdict)
    }

    /// Dry run: classify without persisting. Store failures always surface.
    pub async fn check(&self, user_id: &str, input: LocationInput) -> Result<SpoofVerdict, AttendanceError> {
        Ok(self.detector.detect(user_id, input).await?)
    }

    pub async fn list_attendance(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        Ok(self.log.list_for_user(user_id, limit).await?)
    }

    pub async fn list_fences(&self) -> Result<Vec<GeoFence>, AttendanceError> {
        Ok(self.fences.list_fences().await?)
    }

    pub async fn add_fence(&self, name: &str, center: GeoPoint, radius_meters: f64) -> Result<GeoFence, AttendanceError> {
        if !radius_meters.is_finite() || radius_meters < self.min_fence_radius_meters {
            return Err(AttendanceError::Invalid(format!(
                "radius_meters must be at least {}",
                self.min_fence_radius_meters
            )));
        }

        let fence = self.fences.add_fence(name, center, radius_meters).await?;
        tracing::info!("Geofence registered: {} ({}, {:.0} m)", fence.name, fence.id, fence.radius_meters);
        Ok(fence)
    }

    /// Spoof screen with the configured history failure policy applied
    async fn screen(&self, sample: &LocationSample) -> Result<SpoofVerdict, AttendanceError> {
        match self.detector.detect_sample(sample).await {
            Ok(verdict) => Ok(verdict),
            Err(SpoofError::HistoryUnavailable(err)) if self.policy == HistoryFailurePolicy::FailOpen => {
                tracing::warn!(
                    "History unavailable for user {}, failing open: {}",
                    sample.user_id, err
                );
                // History-free layers still apply
                Ok(evaluate(sample, None, &[], self.detector.thresholds()))
            }
            Err(err @ SpoofError::HistoryUnavailable(_)) => {
                tracing::error!("Spoof screen failed for user {}: {}", sample.user_id, err);
                Err(err.into())
            }
            Err(err) => {
                tracing::warn!("Sample for user {} not screened: {}", sample.user_id, err);
                Err(err.into())
            }
        }
    }

    async fn lock_user(&self, user_id: &str) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(user_id).await),
            None => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    const MUMBAI: (f64, f64) = (19.07609, 72.87723);
    const DELHI: (f64, f64) = (28.7041, 77.1025);
    const NEARBY: (f64, f64) = (19.07700, 72.87800);

    async fn service_with(config: Config) -> (AttendanceService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = AttendanceService::new(store.clone(), &config);
        service
            .add_fence("Mumbai Office", GeoPoint::new(MUMBAI.0, MUMBAI.1), 200.0)
            .await
            .unwrap();
        (service, store)
    }

    #[tokio::test]
    async fn test_check_in_inside_office() {
        let (service, store) = service_with(Config::default()).await;

        let input = LocationInput::at(NEARBY.0, NEARBY.1).with_accuracy(12.0);
        let record = service.check_in("emp-1", input).await.unwrap();

        assert!(!record.is_out_of_range);
        assert_eq!(record.office_name.as_deref(), Some("Mumbai Office"));
        assert_eq!(record.method, "login");
        assert_eq!(store.sample_count("emp-1"), 1);
    }

    #[tokio::test]
    async fn test_check_in_out_of_range_is_still_recorded() {
        let (service, _) = service_with(Config::default()).await;

        let record = service
            .check_in("emp-1", LocationInput::at(DELHI.0, DELHI.1).with_accuracy(10.0))
            .await
            .unwrap();

        assert!(record.is_out_of_range);
        assert!(record.distance_meters.unwrap() > 1_000_000.0);
    }

    #[tokio::test]
    async fn test_spoofed_check_in_rejected_and_not_appended() {
        let (service, store) = service_with(Config::default()).await;
        let now = Utc::now();

        service
            .check_in(
                "emp-1",
                LocationInput::at(MUMBAI.0, MUMBAI.1).with_timestamp(now - Duration::minutes(1)),
            )
            .await
            .unwrap();

        let err = service
            .check_in("emp-1", LocationInput::at(DELHI.0, DELHI.1).with_timestamp(now))
            .await
            .unwrap_err();

        assert!(matches!(err, AttendanceError::Spoofed(SpoofReason::SpeedSpoofing)));
        assert_eq!(store.sample_count("emp-1"), 1);
        assert_eq!(service.list_attendance("emp-1", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_closed_on_history_outage() {
        let (service, store) = service_with(Config::default()).await;
        store.set_history_unavailable(true);

        let err = service
            .check_in("emp-1", LocationInput::at(NEARBY.0, NEARBY.1))
            .await
            .unwrap_err();

        assert!(matches!(err, AttendanceError::Spoof(SpoofError::HistoryUnavailable(_))));
        assert_eq!(store.sample_count("emp-1"), 0);
    }

    #[tokio::test]
    async fn test_fail_open_still_checks_accuracy() {
        let config = Config {
            history_failure_policy: HistoryFailurePolicy::FailOpen,
            ..Config::default()
        };
        let (service, store) = service_with(config).await;
        store.set_history_unavailable(true);

        let record = service
            .check_in("emp-1", LocationInput::at(NEARBY.0, NEARBY.1).with_accuracy(8.0))
            .await
            .unwrap();
        assert!(!record.is_out_of_range);

        let err = service
            .check_in("emp-1", LocationInput::at(NEARBY.0, NEARBY.1).with_accuracy(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Spoofed(SpoofReason::AccuracySpoofing)));
    }

    #[tokio::test]
    async fn test_dry_run_check_ignores_fail_open() {
        let config = Config {
            history_failure_policy: HistoryFailurePolicy::FailOpen,
            ..Config::default()
        };
        let (service, store) = service_with(config).await;
        store.set_history_unavailable(true);

        let err = service.check("emp-1", LocationInput::at(NEARBY.0, NEARBY.1)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Spoof(SpoofError::HistoryUnavailable(_))));
    }

    #[tokio::test]
    async fn test_track_appends_only_genuine() {
        let (service, store) = service_with(Config::default()).await;
        let now = Utc::now();

        let verdict = service
            .track("emp-1", LocationInput::at(MUMBAI.0, MUMBAI.1).with_timestamp(now - Duration::seconds(30)))
            .await
            .unwrap();
        assert!(!verdict.is_spoofed);

        let verdict = service
            .track("emp-1", LocationInput::at(DELHI.0, DELHI.1).with_timestamp(now))
            .await
            .unwrap();
        assert_eq!(verdict.reason, Some(SpoofReason::SpeedSpoofing));
        assert_eq!(store.sample_count("emp-1"), 1);

        let latest = store.latest_sample("emp-1").await.unwrap().unwrap();
        assert_eq!(latest.method, "periodic");
    }

    #[tokio::test]
    async fn test_missing_coordinates_rejected() {
        let (service, _) = service_with(Config::default()).await;
        let input = LocationInput { latitude: Some(19.0), ..Default::default() };

        let err = service.check_in("emp-1", input).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Spoof(SpoofError::MissingCoordinate("longitude"))));
    }

    #[tokio::test]
    async fn test_fence_radius_minimum() {
        let (service, _) = service_with(Config::default()).await;

        let err = service
            .add_fence("Kiosk", GeoPoint::new(0.0, 0.0), 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Invalid(_)));
        assert_eq!(service.list_fences().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_user_locks_serialize_same_user_only() {
        let locks = UserLocks::default();
        let _held = locks.acquire("emp-1").await;

        let same = tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire("emp-1")).await;
        assert!(same.is_err(), "second acquire for the same user should wait");

        let other = tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire("emp-2")).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_future_dated_check_in_rejected() {
        let (service, store) = service_with(Config::default()).await;
        let now = Utc::now();

        let err = service
            .check_in("emp-1", LocationInput::at(MUMBAI.0, MUMBAI.1).with_timestamp(now + Duration::days(3650)))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Spoof(SpoofError::TimestampInFuture(_))));
        assert_eq!(store.sample_count("emp-1"), 0);

        // Later check-ins are still speed-checked against real history
        service
            .check_in("emp-1", LocationInput::at(MUMBAI.0, MUMBAI.1).with_timestamp(now - Duration::minutes(1)))
            .await
            .unwrap();
        let err = service
            .check_in("emp-1", LocationInput::at(DELHI.0, DELHI.1))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Spoofed(SpoofReason::SpeedSpoofing)));
    }

    #[tokio::test]
    async fn test_extreme_past_timestamp_rejected_without_panic() {
        let (service, store) = service_with(Config::default()).await;
        let ancient: chrono::DateTime<Utc> = serde_json::from_str("\"-262143-01-01T00:00:00Z\"").unwrap();

        let err = service
            .check("emp-1", LocationInput::at(19.0, 72.0).with_timestamp(ancient))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Spoof(SpoofError::TimestampOutOfRange(_))));

        let err = service
            .check_in("emp-1", LocationInput::at(19.0, 72.0).with_timestamp(ancient))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Spoof(SpoofError::TimestampOutOfRange(_))));
        assert_eq!(store.sample_count("emp-1"), 0);
    }

    #[tokio::test]
    async fn test_failed_record_leaves_history_untouched() {
        let (service, store) = service_with(Config::default()).await;
        store.set_attendance_unavailable(true);

        let err = service
            .check_in("emp-1", LocationInput::at(NEARBY.0, NEARBY.1).with_accuracy(10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Store(_)));
        assert_eq!(store.sample_count("emp-1"), 0);

        store.set_attendance_unavailable(false);
        service
            .check_in("emp-1", LocationInput::at(NEARBY.0, NEARBY.1).with_accuracy(10.0))
            .await
            .unwrap();
        assert_eq!(store.sample_count("emp-1"), 1);
        assert_eq!(service.list_attendance("emp-1", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_attendance_newest_first() {
        let (service, _) = service_with(Config::default()).await;
        let now = Utc::now();

        for mins in [30, 10, 20] {
            service
                .check_in(
                    "emp-1",
                    LocationInput::at(NEARBY.0, NEARBY.1).with_timestamp(now - Duration::minutes(mins)),
                )
                .await
                .unwrap();
        }

        let records = service.list_attendance("emp-1", Some(2)).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].recorded_at, now - Duration::minutes(10));
        assert_eq!(records[1].recorded_at, now - Duration::minutes(20));
    }
}
