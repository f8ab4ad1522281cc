//! Spoof Detection Types
//!
//! Samples, verdicts and errors. No detection logic here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::GeoPoint;
use crate::store::StoreError;

/// Provenance tag used when the caller does not supply one
pub const DEFAULT_METHOD: &str = "login";

// ============================================================================
// LOCATION SAMPLE
// ============================================================================

/// Immutable location fact, appended to a user's history once accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Sensor-reported uncertainty radius (meters)
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
    /// Informational only ("login", "periodic", ...)
    pub method: String,
}

impl LocationSample {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Unvalidated sample as submitted by a caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub method: Option<String>,
}

impl LocationInput {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Default::default()
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Validate shape and stamp the sample. A missing timestamp becomes `now`;
    /// one more than `max_skew` ahead of `now` is rejected.
    pub fn into_sample(
        self,
        user_id: &str,
        now: DateTime<Utc>,
        max_skew: Duration,
    ) -> Result<LocationSample, SpoofError> {
        let latitude = self.latitude.ok_or(SpoofError::MissingCoordinate("latitude"))?;
        let longitude = self.longitude.ok_or(SpoofError::MissingCoordinate("longitude"))?;

        check_range("latitude", latitude, 90.0)?;
        check_range("longitude", longitude, 180.0)?;

        if let Some(accuracy) = self.accuracy {
            if !accuracy.is_finite() {
                return Err(SpoofError::InvalidValue { field: "accuracy", value: accuracy });
            }
        }

        let timestamp = self.timestamp.unwrap_or(now);
        if timestamp.signed_duration_since(now) > max_skew {
            return Err(SpoofError::TimestampInFuture(timestamp));
        }

        Ok(LocationSample {
            user_id: user_id.to_string(),
            latitude,
            longitude,
            accuracy: self.accuracy,
            timestamp,
            method: self.method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
        })
    }
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), SpoofError> {
    if value.is_finite() && value.abs() <= limit {
        Ok(())
    } else {
        Err(SpoofError::InvalidValue { field, value })
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Why a sample was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpoofReason {
    SpeedSpoofing,
    AccuracySpoofing,
    TeleportationSpoofing,
}

impl SpoofReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpoofReason::SpeedSpoofing => "speed_spoofing",
            SpoofReason::AccuracySpoofing => "accuracy_spoofing",
            SpoofReason::TeleportationSpoofing => "teleportation_spoofing",
        }
    }

    /// Message shown to the user whose check-in was rejected
    pub fn message(&self) -> &'static str {
        match self {
            SpoofReason::SpeedSpoofing => {
                "flagged: unrealistic travel speed since last recorded location"
            }
            SpoofReason::AccuracySpoofing => {
                "flagged: reported GPS accuracy is implausible for a real device fix"
            }
            SpoofReason::TeleportationSpoofing => {
                "flagged: repeated location jumps detected in the last few minutes"
            }
        }
    }
}

impl std::fmt::Display for SpoofReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoofVerdict {
    pub is_spoofed: bool,
    pub reason: Option<SpoofReason>,
}

impl SpoofVerdict {
    pub fn genuine() -> Self {
        Self { is_spoofed: false, reason: None }
    }

    pub fn spoofed(reason: SpoofReason) -> Self {
        Self { is_spoofed: true, reason: Some(reason) }
    }
}

impl From<Option<SpoofReason>> for SpoofVerdict {
    fn from(reason: Option<SpoofReason>) -> Self {
        reason.map_or_else(Self::genuine, Self::spoofed)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum SpoofError {
    #[error("missing {0}")]
    MissingCoordinate(&'static str),

    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("timestamp {0} is ahead of server time")]
    TimestampInFuture(DateTime<Utc>),

    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(DateTime<Utc>),

    #[error("location history unavailable: {0}")]
    HistoryUnavailable(#[from] StoreError),
}
