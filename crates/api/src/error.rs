//! Error-to-response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use foresight_db::repositories::exchange_rate::ExchangeRateError;
use foresight_db::repositories::import::ImportError;
use foresight_db::repositories::project::ProjectError;
use foresight_shared::AppError;

/// Wrapper turning [`AppError`] into an HTTP response.
///
/// Repository errors convert into the shared taxonomy first, so every
/// handler returns the same `{error, message}` body shape.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = json!({
            "error": self.0.error_code(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        Self(AppError::Database(error.to_string()))
    }
}

impl From<ProjectError> for ApiError {
    fn from(error: ProjectError) -> Self {
        let app = match &error {
            ProjectError::NotFound(_) => AppError::NotFound(error.to_string()),
            ProjectError::OpIdsInUse(_, _) => AppError::Conflict(error.to_string()),
            ProjectError::MissingProjectNumber => AppError::Validation(error.to_string()),
            ProjectError::Database(e) => AppError::Database(e.to_string()),
        };
        Self(app)
    }
}

impl From<ExchangeRateError> for ApiError {
    fn from(error: ExchangeRateError) -> Self {
        let app = match &error {
            ExchangeRateError::NonPositiveRate(_) => AppError::Validation(error.to_string()),
            ExchangeRateError::Database(e) => AppError::Database(e.to_string()),
        };
        Self(app)
    }
}

impl From<ImportError> for ApiError {
    fn from(error: ImportError) -> Self {
        let app = match &error {
            // Column mapping problems are the caller's file, not our fault
            ImportError::Excel(e) => AppError::Validation(e.to_string()),
            ImportError::Database(e) => AppError::Database(e.to_string()),
            ImportError::Password(e) => AppError::Internal(e.clone()),
        };
        Self(app)
    }
}

/// Shorthand for a validation failure.
pub fn validation(message: impl Into<String>) -> ApiError {
    ApiError(AppError::Validation(message.into()))
}

/// Shorthand for a role-based denial.
pub fn forbidden(message: impl Into<String>) -> ApiError {
    ApiError(AppError::Forbidden(message.into()))
}
