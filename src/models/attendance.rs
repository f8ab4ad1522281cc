//! Attendance record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use uuid::Uuid;

use crate::geo::FenceCheck;
use crate::spoof::LocationSample;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub method: String,
    pub office_id: Option<Uuid>,
    pub office_name: Option<String>,
    pub distance_meters: Option<f64>,
    pub is_out_of_range: bool,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Attendance entry ready to be persisted
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub sample: LocationSample,
    pub fence_check: FenceCheck,
}

#[derive(Debug, Deserialize, Default)]
pub struct AttendanceFilter {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub record: AttendanceRecord,
    pub is_out_of_range: bool,
    pub server_time: i64,
}

impl AttendanceRecord {
    pub async fn create<'e, E: PgExecutor<'e>>(executor: E, entry: &NewAttendance) -> Result<Self, sqlx::Error> {
        let sample = &entry.sample;
        let nearest = entry.fence_check.nearest.as_ref();

        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance_records
                (user_id, latitude, longitude, accuracy, method, office_id, office_name, distance_meters, is_out_of_range, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#
        )
        .bind(&sample.user_id)
        .bind(sample.latitude)
        .bind(sample.longitude)
        .bind(sample.accuracy)
        .bind(&sample.method)
        .bind(nearest.map(|n| n.fence_id))
        .bind(nearest.map(|n| n.name.clone()))
        .bind(nearest.map(|n| n.distance_meters))
        .bind(entry.fence_check.is_out_of_range)
        .bind(sample.timestamp)
        .fetch_one(executor)
        .await
    }

    pub async fn list_for_user(pool: &PgPool, user_id: &str, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE user_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Build a record without a database round-trip
    pub fn from_entry(entry: NewAttendance) -> Self {
        let nearest = entry.fence_check.nearest;
        let sample = entry.sample;

        Self {
            id: Uuid::new_v4(),
            user_id: sample.user_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: sample.accuracy,
            method: sample.method,
            office_id: nearest.as_ref().map(|n| n.fence_id),
            office_name: nearest.as_ref().map(|n| n.name.clone()),
            distance_meters: nearest.as_ref().map(|n| n.distance_meters),
            is_out_of_range: entry.fence_check.is_out_of_range,
            recorded_at: sample.timestamp,
            created_at: Utc::now(),
        }
    }
}
