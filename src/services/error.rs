use crate::store::StoreError;
use crate::{ApiError, ErrorResponse};
use rocket::serde::json::Json;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    InvalidOperation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InternalError(String),
}

impl ServiceError {
    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidRequest(_) => "invalid_request",
            ServiceError::InvalidOperation(_) => "invalid_operation",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::InternalError(_) => "internal_server_error",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => {
                ServiceError::Conflict(format!("Record already exists ({})", constraint))
            }
            StoreError::NotFound => ServiceError::NotFound("Record not found".to_string()),
            other => {
                tracing::error!(error = %other, "store failure");
                ServiceError::InternalError("Database error".to_string())
            }
        }
    }
}

impl From<bcrypt::BcryptError> for ServiceError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!(error = %err, "password hashing failed");
        ServiceError::InternalError("Password hashing failed".to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let body = Json(ErrorResponse {
            error: err.code().to_string(),
            message: err.to_string(),
        });
        match err {
            ServiceError::NotFound(_) => ApiError::NotFound(body),
            ServiceError::InvalidRequest(_) | ServiceError::InvalidOperation(_) => ApiError::BadRequest(body),
            ServiceError::Forbidden(_) => ApiError::Forbidden(body),
            ServiceError::Unauthorized(_) => ApiError::Unauthorized(body),
            ServiceError::Conflict(_) => ApiError::Conflict(body),
            ServiceError::InternalError(_) => ApiError::InternalError(body),
        }
    }
}
