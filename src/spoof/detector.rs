//! Spoof Detector
//!
//! Three layers run in fixed priority order, first hit wins:
//! speed -> accuracy -> teleportation burst.
//! Each layer is a pure function over the sample and the fetched history.

use std::sync::Arc;

use chrono::Utc;

use super::rules::{SpoofThresholds, MS_TO_KMH};
use super::types::{LocationInput, LocationSample, SpoofError, SpoofReason, SpoofVerdict};
use crate::geo::distance_meters;
use crate::store::HistoryStore;

// ============================================================================
// LAYERS
// ============================================================================

/// Travel speed from `earlier` to `later` in km/h.
///
/// `None` when the time delta is not positive (clock skew, duplicate timestamp).
pub fn speed_kmh(earlier: &LocationSample, later: &LocationSample) -> Option<f64> {
    let elapsed_ms = (later.timestamp - earlier.timestamp).num_milliseconds();
    if elapsed_ms <= 0 {
        return None;
    }

    let distance = distance_meters(
        earlier.latitude,
        earlier.longitude,
        later.latitude,
        later.longitude,
    );
    let elapsed_secs = elapsed_ms as f64 / 1000.0;

    Some(distance / elapsed_secs * MS_TO_KMH)
}

/// Layer 1: speed since the most recent persisted sample
pub fn check_speed(
    sample: &LocationSample,
    last: Option<&LocationSample>,
    thresholds: &SpoofThresholds,
) -> Option<SpoofReason> {
    let last = last?;
    let speed = speed_kmh(last, sample)?;

    if speed > thresholds.speed_threshold_kmh {
        tracing::warn!(
            "Speed spoofing for user {}: {:.1} km/h since {} (limit {:.0})",
            sample.user_id, speed, last.timestamp, thresholds.speed_threshold_kmh
        );
        return Some(SpoofReason::SpeedSpoofing);
    }
    None
}

/// Layer 2: reported accuracy outside the plausible band
pub fn check_accuracy(sample: &LocationSample, thresholds: &SpoofThresholds) -> Option<SpoofReason> {
    let accuracy = sample.accuracy?;

    if accuracy < thresholds.accuracy_min_meters || accuracy > thresholds.accuracy_max_meters {
        tracing::warn!(
            "Accuracy spoofing for user {}: {} m outside [{}, {}]",
            sample.user_id, accuracy, thresholds.accuracy_min_meters, thresholds.accuracy_max_meters
        );
        return Some(SpoofReason::AccuracySpoofing);
    }
    None
}

/// Layer 3: impossible jumps between consecutive samples of the recent window.
///
/// `window` is newest-first. Only history pairs are walked unless
/// `chain_new_sample` is set, in which case the new sample is also paired
/// with its neighbours at its place in the timeline.
pub fn check_teleportation(
    sample: &LocationSample,
    window: &[LocationSample],
    thresholds: &SpoofThresholds,
) -> Option<SpoofReason> {
    let mut chained = Vec::new();
    if thresholds.chain_new_sample {
        let split = window.partition_point(|s| s.timestamp >= sample.timestamp);
        if let Some(newer) = split.checked_sub(1).and_then(|i| window.get(i)) {
            chained.extend(speed_kmh(sample, newer));
        }
        if let Some(older) = window.get(split) {
            chained.extend(speed_kmh(older, sample));
        }
    }

    let history = window
        .windows(2)
        .filter_map(|pair| speed_kmh(&pair[1], &pair[0]));

    for speed in chained.into_iter().chain(history) {
        if speed > thresholds.speed_threshold_kmh {
            tracing::warn!(
                "Teleportation spoofing for user {}: jump at {:.1} km/h within last {} ms",
                sample.user_id, speed, thresholds.time_window_ms
            );
            return Some(SpoofReason::TeleportationSpoofing);
        }
    }
    None
}

/// Run all layers in priority order over already-fetched history.
pub fn evaluate(
    sample: &LocationSample,
    last: Option<&LocationSample>,
    window: &[LocationSample],
    thresholds: &SpoofThresholds,
) -> SpoofVerdict {
    check_speed(sample, last, thresholds)
        .or_else(|| check_accuracy(sample, thresholds))
        .or_else(|| check_teleportation(sample, window, thresholds))
        .into()
}

// ============================================================================
// DETECTOR
// ============================================================================

/// Stateless detector bound to a history store and a fixed policy
#[derive(Clone)]
pub struct SpoofDetector {
    store: Arc<dyn HistoryStore>,
    thresholds: SpoofThresholds,
}

impl SpoofDetector {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self::with_thresholds(store, SpoofThresholds::default())
    }

    pub fn with_thresholds(store: Arc<dyn HistoryStore>, thresholds: SpoofThresholds) -> Self {
        Self { store, thresholds }
    }

    pub fn thresholds(&self) -> &SpoofThresholds {
        &self.thresholds
    }

    /// Validate `input` for `user_id` and classify it.
    pub async fn detect(&self, user_id: &str, input: LocationInput) -> Result<SpoofVerdict, SpoofError> {
        let sample = input.into_sample(user_id, Utc::now(), self.thresholds.max_clock_skew())?;
        self.detect_sample(&sample).await
    }

    /// Classify an already validated sample against persisted history.
    ///
    /// Both history reads are issued together; a failed read aborts the call.
    /// A timestamp too close to the calendar limit to open a window is rejected.
    pub async fn detect_sample(&self, sample: &LocationSample) -> Result<SpoofVerdict, SpoofError> {
        let since = sample
            .timestamp
            .checked_sub_signed(self.thresholds.time_window())
            .ok_or(SpoofError::TimestampOutOfRange(sample.timestamp))?;

        let (last, window) = tokio::try_join!(
            self.store.latest_sample(&sample.user_id),
            self.store.samples_since(&sample.user_id, since, self.thresholds.teleport_sample_limit),
        )?;

        let verdict = evaluate(sample, last.as_ref(), &window, &self.thresholds);

        match verdict.reason {
            Some(reason) => tracing::info!(
                "Sample for user {} rejected: {} (history: last={}, window={})",
                sample.user_id, reason, last.is_some(), window.len()
            ),
            None => tracing::debug!(
                "Sample for user {} passed spoof checks (history: last={}, window={})",
                sample.user_id, last.is_some(), window.len()
            ),
        }

        Ok(verdict)
    }
}

// ============================================================================
// TESTS
// ============================================================================
