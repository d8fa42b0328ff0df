//! Error types for the Meetlink server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned in API error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    NotFound = 3,
    BadValue = 4,
    Duplicate = 5,
    InvalidConfiguration = 6,
    InvalidDate = 7,
    SlotNoLongerAvailable = 8,
    LeadDisqualified = 9,
    NotProvisioned = 10,
    EmailFailure = 11,
    BusinessRule = 12,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed booking-link configuration (e.g. non-positive increment)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Unparseable date, time or timezone
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The requested slot was taken between browse and commit
    #[error("Slot no longer available: {0}")]
    SlotNoLongerAvailable(String),

    #[error("Lead disqualified: {0}")]
    LeadDisqualified(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// A backing table or collaborator has not been provisioned
    #[error("Not provisioned: {0}")]
    NotProvisioned(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error means a collaborator is missing rather than faulty
    pub fn is_not_provisioned(&self) -> bool {
        matches!(self, AppError::NotProvisioned(_))
    }
}

/// Postgres SQLSTATE for `undefined_table`
const UNDEFINED_TABLE: &str = "42P01";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(UNDEFINED_TABLE) {
                return AppError::NotProvisioned(db_err.message().to_string());
            }
        }
        AppError::Database(err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidConfiguration(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InvalidConfiguration,
                msg.clone(),
            ),
            AppError::InvalidDate(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::InvalidDate, msg.clone())
            }
            AppError::SlotNoLongerAvailable(msg) => (
                StatusCode::CONFLICT,
                ErrorCode::SlotNoLongerAvailable,
                msg.clone(),
            ),
            AppError::LeadDisqualified(msg) => (
                StatusCode::FORBIDDEN,
                ErrorCode::LeadDisqualified,
                msg.clone(),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BusinessRule(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::BusinessRule,
                msg.clone(),
            ),
            AppError::NotProvisioned(msg) => {
                tracing::error!("Store not provisioned: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::NotProvisioned,
                    "Storage not provisioned".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Email(msg) => {
                tracing::error!("Email error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorCode::EmailFailure,
                    "Email delivery failed".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
