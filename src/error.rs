//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::attendance::AttendanceError;
use crate::spoof::{SpoofError, SpoofReason};
use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Resource errors
    NotFound(String),

    // Validation errors
    ValidationError(String),

    // Location rejected by the spoof detector
    SpoofDetected(SpoofReason),

    // Location history could not be read
    HistoryUnavailable(String),

    // Database errors
    DatabaseError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::SpoofDetected(reason) => {
                tracing::warn!("Location rejected: {}", reason);
                let body = Json(json!({
                    "error": reason.message(),
                    "reason": reason.as_str(),
                    "status": StatusCode::FORBIDDEN.as_u16()
                }));
                return (StatusCode::FORBIDDEN, body).into_response();
            }
            AppError::HistoryUnavailable(msg) => {
                tracing::error!("History unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Location history unavailable, try again later")
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => e.into(),
            StoreError::Unavailable(msg) => AppError::InternalError(msg),
        }
    }
}

impl From<SpoofError> for AppError {
    fn from(err: SpoofError) -> Self {
        match err {
            SpoofError::HistoryUnavailable(e) => AppError::HistoryUnavailable(e.to_string()),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}

impl From<AttendanceError> for AppError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::Spoofed(reason) => AppError::SpoofDetected(reason),
            AttendanceError::Invalid(msg) => AppError::ValidationError(msg),
            AttendanceError::Spoof(e) => e.into(),
            AttendanceError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::SpoofDetected(SpoofReason::SpeedSpoofing), StatusCode::FORBIDDEN),
            (AppError::ValidationError("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::HistoryUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::NotFound("nope".into()), StatusCode::NOT_FOUND),
            (AppError::DatabaseError("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_attendance_error_conversion() {
        let err: AppError = AttendanceError::Spoof(SpoofError::MissingCoordinate("latitude")).into();
        assert!(matches!(err, AppError::ValidationError(msg) if msg == "missing latitude"));

        let err: AppError = AttendanceError::Spoof(SpoofError::HistoryUnavailable(
            StoreError::Unavailable("down".into()),
        ))
        .into();
        assert!(matches!(err, AppError::HistoryUnavailable(_)));

        let err: AppError = AttendanceError::Spoof(SpoofError::TimestampInFuture(chrono::Utc::now())).into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
