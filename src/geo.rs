//! Geo-Distance Engine
//!
//! Great-circle distance (Haversine) and geofence containment.
//! Pure functions only - no I/O, no shared state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Earth mean radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// ============================================================================
// DISTANCE
// ============================================================================

/// Shortest surface distance in meters between two (lat, lon) points in degrees.
///
/// No range validation is done here. Out-of-range input gives a defined but
/// meaningless number, never a panic.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();
    let d_lat = lat2_r - lat1_r;
    let d_lon = lon2.to_radians() - lon1.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// A (latitude, longitude) pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_meters(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

// ============================================================================
// GEOFENCES
// ============================================================================

/// Circular office region accepted for attendance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFence {
    pub id: Uuid,
    pub name: String,
    pub center: GeoPoint,
    /// Acceptance radius, must be > 0
    pub radius_meters: f64,
}

impl GeoFence {
    pub fn distance_to(&self, point: &GeoPoint) -> f64 {
        self.center.distance_to(point)
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.distance_to(point) <= self.radius_meters
    }
}

/// Nearest fence for a point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestFence {
    pub fence_id: Uuid,
    pub name: String,
    pub distance_meters: f64,
    pub radius_meters: f64,
}

/// Result of checking a point against every registered fence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FenceCheck {
    pub nearest: Option<NearestFence>,
    /// True when the point lies outside every fence (or there are none)
    pub is_out_of_range: bool,
}

/// Check a point against all fences.
pub fn check_fences(point: &GeoPoint, fences: &[GeoFence]) -> FenceCheck {
    let mut nearest: Option<NearestFence> = None;
    let mut inside_any = false;

    for fence in fences {
        let distance = fence.distance_to(point);
        if distance <= fence.radius_meters {
            inside_any = true;
        }

        let closer = nearest
            .as_ref()
            .map_or(true, |n| distance < n.distance_meters);
        if closer {
            nearest = Some(NearestFence {
                fence_id: fence.id,
                name: fence.name.clone(),
                distance_meters: distance,
                radius_meters: fence.radius_meters,
            });
        }
    }

    FenceCheck {
        nearest,
        is_out_of_range: !inside_any,
    }
}

// ============================================================================
// TESTS
// ============================================================================
