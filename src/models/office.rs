//! Office (geofence) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::geo::{GeoFence, GeoPoint};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Office {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Office> for GeoFence {
    fn from(office: Office) -> Self {
        Self {
            id: office.id,
            name: office.name,
            center: GeoPoint::new(office.latitude, office.longitude),
            radius_meters: office.radius_meters,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOffice {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub radius_meters: f64,
}

impl Office {
    pub async fn create(
        pool: &PgPool,
        name: &str,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Office>(
            r#"
            INSERT INTO offices (name, latitude, longitude, radius_meters)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#
        )
        .bind(name)
        .bind(center.latitude)
        .bind(center.longitude)
        .bind(radius_meters)
        .fetch_one(pool)
        .await
    }

    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Office>(
            "SELECT * FROM offices WHERE is_active = true ORDER BY created_at ASC"
        )
        .fetch_all(pool)
        .await
    }
}
