use axum::{Json, http::StatusCode};
use serde::Serialize;

use crate::application::errors::{Classified, ErrorClass};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(code: String, message: String, details: Option<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message,
                details,
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Error envelope with the status matching the error's class. The debug
    /// form goes into `details` only when `expose_details` is set.
    pub fn from_error<E>(error: &E, expose_details: bool) -> (StatusCode, Json<Self>)
    where
        E: Classified + std::error::Error,
    {
        let class = error.class();
        let details = expose_details.then(|| format!("{:?}", error));

        match class {
            ErrorClass::Input => tracing::debug!("Rejected request: {}", error),
            _ => tracing::error!("Request failed ({}): {}", class.code(), error),
        }

        (
            status_for(class),
            Json(Self::error(class.code().to_string(), error.to_string(), details)),
        )
    }
}

pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Input => StatusCode::BAD_REQUEST,
        ErrorClass::Extraction => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::DependentService => StatusCode::BAD_GATEWAY,
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponseDto {
    pub status: String,
    pub version: String,
}
