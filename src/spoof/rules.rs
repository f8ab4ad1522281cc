//! Spoof Detection Rules & Thresholds
//!
//! Constants and the settings value handed to the detector.
//! No detection logic here.

use serde::{Deserialize, Serialize};

/// Speed between two samples above this is impossible for a commuter
pub const SPEED_THRESHOLD_KMH: f64 = 1000.0;

/// Accuracy below this is suspiciously perfect (mock locations report 0)
pub const ACCURACY_MIN_METERS: f64 = 1.0;

/// Accuracy above this is too poor to trust as a recent fix
pub const ACCURACY_MAX_METERS: f64 = 1000.0;

/// Trailing window searched for a teleportation burst (5 min)
pub const TIME_WINDOW_MS: i64 = 300_000;

/// Max recent samples examined inside the window
pub const TELEPORT_SAMPLE_LIMIT: usize = 5;

/// How far ahead of server time a client timestamp may be (2 min)
pub const MAX_CLOCK_SKEW_MS: i64 = 120_000;

/// Upper bound accepted for a configured window (24h)
pub const MAX_TIME_WINDOW_MS: i64 = 86_400_000;

/// Upper bound accepted for a configured sample limit
pub const MAX_TELEPORT_SAMPLE_LIMIT: usize = 100;

/// m/s -> km/h
pub const MS_TO_KMH: f64 = 3.6;

/// Detector settings. Immutable once handed to a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoofThresholds {
    pub speed_threshold_kmh: f64,
    pub accuracy_min_meters: f64,
    pub accuracy_max_meters: f64,
    pub time_window_ms: i64,
    pub teleport_sample_limit: usize,
    pub max_clock_skew_ms: i64,
    /// Also walk the new sample against its neighbours in the window
    pub chain_new_sample: bool,
}

impl Default for SpoofThresholds {
    fn default() -> Self {
        Self {
            speed_threshold_kmh: SPEED_THRESHOLD_KMH,
            accuracy_min_meters: ACCURACY_MIN_METERS,
            accuracy_max_meters: ACCURACY_MAX_METERS,
            time_window_ms: TIME_WINDOW_MS,
            teleport_sample_limit: TELEPORT_SAMPLE_LIMIT,
            max_clock_skew_ms: MAX_CLOCK_SKEW_MS,
            chain_new_sample: false,
        }
    }
}

impl SpoofThresholds {
    /// Out-of-range settings are clamped into `[0, MAX_TIME_WINDOW_MS]`
    pub fn time_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.time_window_ms.clamp(0, MAX_TIME_WINDOW_MS))
    }

    pub fn max_clock_skew(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.max_clock_skew_ms.clamp(0, MAX_TIME_WINDOW_MS))
    }

    /// Stricter policy for sites where commuters never fly
    pub fn strict() -> Self {
        Self {
            speed_threshold_kmh: 250.0,
            accuracy_max_meters: 200.0,
            chain_new_sample: true,
            ..Default::default()
        }
    }
}
