//! Location history model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use validator::Validate;

use crate::spoof::{LocationInput, LocationSample, SpoofVerdict};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationRecord {
    pub id: i64,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub method: String,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<LocationRecord> for LocationSample {
    fn from(record: LocationRecord) -> Self {
        Self {
            user_id: record.user_id,
            latitude: record.latitude,
            longitude: record.longitude,
            accuracy: record.accuracy,
            timestamp: record.recorded_at,
            method: record.method,
        }
    }
}

/// Location submitted by a client (check-in, tracking, dry-run check)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    #[validate(length(max = 32))]
    pub method: Option<String>,
}

impl LocationRequest {
    pub fn into_parts(self) -> (String, LocationInput) {
        let input = LocationInput {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            timestamp: self.timestamp,
            method: self.method,
        };
        (self.user_id, input)
    }
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub accepted: bool,
    pub verdict: SpoofVerdict,
    pub server_time: i64,
}

impl LocationRecord {
    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, sample: &LocationSample) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, LocationRecord>(
            r#"
            INSERT INTO location_history (user_id, latitude, longitude, accuracy, method, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#
        )
        .bind(&sample.user_id)
        .bind(sample.latitude)
        .bind(sample.longitude)
        .bind(sample.accuracy)
        .bind(&sample.method)
        .bind(sample.timestamp)
        .fetch_one(executor)
        .await
    }

    pub async fn latest_for_user(pool: &PgPool, user_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, LocationRecord>(
            r#"
            SELECT * FROM location_history
            WHERE user_id = $1
            ORDER BY recorded_at DESC
            LIMIT 1
            "#
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn recent_for_user(
        pool: &PgPool,
        user_id: &str,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, LocationRecord>(
            r#"
            SELECT * FROM location_history
            WHERE user_id = $1 AND recorded_at >= $2
            ORDER BY recorded_at DESC
            LIMIT $3
            "#
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
