//! Spoof Module
//!
//! Decides whether a new location sample is fraudulent GPS input
//! before it is accepted into attendance records.
//!
//! ## Structure
//! - `types`: samples, verdicts, errors
//! - `rules`: thresholds and constants
//! - `detector`: layer functions and the store-backed detector
//!
//! ## Usage
//! ```ignore
//! use attendance_guard::spoof::{LocationInput, SpoofDetector};
//!
//! let detector = SpoofDetector::new(store);
//! let verdict = detector.detect("emp-42", LocationInput::at(19.076, 72.877)).await?;
//! if let Some(reason) = verdict.reason {
//!     println!("rejected: {}", reason.message());
//! }
//! ```

pub mod types;
pub mod rules;
pub mod detector;

pub use types::{
    LocationInput,
    LocationSample,
    SpoofError,
    SpoofReason,
    SpoofVerdict,
    DEFAULT_METHOD,
};

pub use rules::{
    SpoofThresholds,
    ACCURACY_MAX_METERS,
    ACCURACY_MIN_METERS,
    MAX_CLOCK_SKEW_MS,
    MAX_TELEPORT_SAMPLE_LIMIT,
    MAX_TIME_WINDOW_MS,
    SPEED_THRESHOLD_KMH,
    TELEPORT_SAMPLE_LIMIT,
    TIME_WINDOW_MS,
};

pub use detector::{
    check_accuracy,
    check_speed,
    check_teleportation,
    evaluate,
    speed_kmh,
    SpoofDetector,
};
