//! # API Error Types
//!
//! Every failure a handler can hit, mapped onto an HTTP status and a small
//! JSON body. Storage, backend and internal failures are logged with full
//! detail but answered with a generic message, so no filesystem path,
//! upstream URL or I/O error text reaches the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fdo_core::{TenancyError, ValidationError};
use fdo_owner_client::{ExchangeError, OwnerError};
use fdo_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned for every authentication failure.
pub const INVALID_CREDENTIALS: &str = "invalid exchange credentials provided";

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. `FORBIDDEN`).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, malformed or rejected credentials (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Root credentials without an explicit organization (400).
    #[error("{0}")]
    TenancyAmbiguous(String),

    /// Wrong content type or malformed path capture (400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown route, device or file (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Device belongs to another organization (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Owner Service or exchange unreachable or misbehaving (502).
    /// Message is logged but not returned to the client.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Local storage failure (500). Message is logged but not returned.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::TenancyAmbiguous(_) => (StatusCode::BAD_REQUEST, "TENANCY_AMBIGUOUS"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::BackendUnavailable(_) => (StatusCode::BAD_GATEWAY, "BACKEND_UNAVAILABLE"),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::BackendUnavailable(_) => "An upstream service is unavailable".to_string(),
            Self::Storage(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            Self::BackendUnavailable(_) => tracing::warn!(error = %self, "backend failure"),
            Self::Storage(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error")
            }
            _ => tracing::debug!(error = %self, status = status.as_u16(), "request rejected"),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<TenancyError> for AppError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::MissingCredentials => Self::Unauthorized(INVALID_CREDENTIALS.to_string()),
            TenancyError::Ambiguous => Self::TenancyAmbiguous(TenancyError::Ambiguous.to_string()),
            TenancyError::InvalidOrg(e) => Self::Validation(e.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match &err {
            StoreError::DeviceNotFound { .. } => Self::NotFound(err.to_string()),
            StoreError::Forbidden { device, org } => {
                Self::Forbidden(format!("Device {device} is not in org {org}"))
            }
            _ => Self::Storage(err.to_string()),
        }
    }
}

impl From<OwnerError> for AppError {
    fn from(err: OwnerError) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}

impl From<ExchangeError> for AppError {
    fn from(err: ExchangeError) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}
