use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use storage::error::{ServiceError, StorageError};
use validator::ValidationErrors;

/// Web layer errors
#[derive(Debug)]
pub enum WebError {
    Storage(StorageError),
    Service(ServiceError),
    Validation(ValidationErrors),
    Unauthorized,
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::Service(e) => write!(f, "Service error: {}", e),
            Self::Validation(e) => write!(f, "Validation error: {}", e),
            Self::Unauthorized => write!(f, "Unauthorized"),
        }
    }
}

fn storage_status(error: &StorageError) -> StatusCode {
    match error {
        StorageError::NotFound => StatusCode::NOT_FOUND,
        StorageError::ConstraintViolation(_) | StorageError::CapacityExceeded { .. } => {
            StatusCode::CONFLICT
        }
        StorageError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn storage_body(error: &StorageError) -> serde_json::Value {
    match error {
        StorageError::NotFound => json!({ "error": "Resource not found" }),
        StorageError::ConstraintViolation(msg) => json!({ "error": msg }),
        StorageError::CapacityExceeded { .. } => json!({ "error": error.to_string() }),
        e => {
            tracing::error!("Storage error: {:?}", e);
            json!({ "error": "An internal error occurred" })
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            Self::Storage(e) => storage_status(e),
            Self::Service(ServiceError::Storage(e)) => storage_status(e),
            Self::Service(ServiceError::MatchNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Service(
                ServiceError::CapacityExceeded { .. }
                | ServiceError::InvalidTransition { .. }
                | ServiceError::MatchNotOpen { .. }
                | ServiceError::InvalidMatchTransition { .. },
            ) => StatusCode::CONFLICT,
            Self::Service(ServiceError::Forbidden) => StatusCode::FORBIDDEN,
            Self::Service(ServiceError::Validation(_) | ServiceError::InvalidRequest(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(ServiceError::MatchCreationFailed(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = match &self {
            Self::Storage(e) | Self::Service(ServiceError::Storage(e)) => storage_body(e),
            Self::Service(ServiceError::MatchCreationFailed(e)) => {
                tracing::error!("Match creation failed: {:?}", e);
                json!({
                    "error": "Match could not be created"
                })
            }
            Self::Service(e) => {
                json!({
                    "error": e.to_string()
                })
            }
            Self::Validation(errors) => {
                let field_errors: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .flat_map(|(field, errors)| {
                        errors.iter().map(move |e| {
                            format!(
                                "{}: {}",
                                field,
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            )
                        })
                    })
                    .collect();

                json!({
                    "error": "Validation failed",
                    "details": field_errors
                })
            }
            Self::Unauthorized => {
                json!({
                    "error": "Unauthorized"
                })
            }
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<StorageError> for WebError {
    fn from(error: StorageError) -> Self {
        Self::Storage(error)
    }
}

impl From<ServiceError> for WebError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::InvalidRequest(errors) => Self::Validation(errors),
            other => Self::Service(other),
        }
    }
}

impl From<ValidationErrors> for WebError {
    fn from(error: ValidationErrors) -> Self {
        Self::Validation(error)
    }
}

pub type ApiResult<T> = Result<T, WebError>;
