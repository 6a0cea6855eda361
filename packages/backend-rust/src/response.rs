use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::services::calibration::CalibrationError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    Json(SuccessResponse {
        success: true,
        data,
    })
    .into_response()
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "INVALID_INPUT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl From<CalibrationError> for AppError {
    fn from(err: CalibrationError) -> Self {
        match &err {
            CalibrationError::NotFound(_) => AppError::not_found(err.to_string()),
            CalibrationError::Forbidden => AppError::forbidden(err.to_string()),
            CalibrationError::Conflict => {
                json_error(StatusCode::CONFLICT, "ALREADY_SUBMITTED", err.to_string())
            }
            CalibrationError::NoItemsAvailable => {
                json_error(StatusCode::NOT_FOUND, "NO_PROBLEMS", err.to_string())
            }
            CalibrationError::InvalidInput(message) => AppError::invalid_input(message.clone()),
            CalibrationError::Store(source) => {
                tracing::error!(error = %source, "calibration store failure");
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(source) => {
                tracing::error!(error = %source, "session lookup failed");
                AppError::internal("session lookup failed")
            }
            other => AppError::unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "Internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}
