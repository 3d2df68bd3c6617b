//! # Error Handling and Response Types
//!
//! Error taxonomy for the registry and its mapping onto HTTP responses.
//!
//! ## Error Classifications
//!
//! - **Validation** (400): malformed names, versions, ranges, archives or descriptors.
//!   Always raised before any storage write.
//! - **Not Found** (404): no such component, or no version inside the requested range.
//! - **Incompatible Host** (409): versions match the requested range but none declares
//!   support for the caller's host version.
//! - **Upload** (413): the request body breaks multipart or size limits.
//! - **Storage** (502): the storage backend failed; the message carries the operation.
//! - **Internal** (500): everything else.
//!
//! ## Error Response Format
//!
//! ```json
//! {
//!   "error": "Human-readable error message",
//!   "code": "machine_readable_error_code",
//!   "details": {...},
//!   "timestamp": "2024-01-01T12:00:00Z"
//! }
//! ```

use crate::storage::StorageError;
use crate::types::ComponentName;
use crate::validation::ValidationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use semver::Version;
use serde::Serialize;
use serde_json::{json, Value};

/// Standardized error response structure for consistent API error handling
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,          // Human-readable error message
    pub code: String,           // Machine-readable error code
    pub details: Option<Value>, // Additional error details
    pub timestamp: String,      // ISO 8601 timestamp
}

/// Error code classification for machine-readable error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    IncompatibleHost,
    UploadError,
    StorageError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::NotFound => "not_found",
            ErrorCode::IncompatibleHost => "incompatible_host",
            ErrorCode::UploadError => "upload_error",
            ErrorCode::StorageError => "storage_error",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::IncompatibleHost => StatusCode::CONFLICT,
            ErrorCode::UploadError => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::StorageError => StatusCode::BAD_GATEWAY,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-specific error types with error codes
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Multipart form parsing error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(
        "Component '{name}' has {} version(s) in the requested range, none compatible with host {host_version}",
        .candidates.len()
    )]
    Incompatible {
        name: ComponentName,
        host_version: Version,
        candidates: Vec<Version>,
    },

    #[error("{0}")]
    UploadError(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Get the appropriate error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_)
            | AppError::BadRequest(_)
            | AppError::Json(_)
            | AppError::Multipart(_) => ErrorCode::ValidationError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Incompatible { .. } => ErrorCode::IncompatibleHost,
            AppError::UploadError(_) => ErrorCode::UploadError,
            AppError::Storage(_) => ErrorCode::StorageError,
            AppError::InternalError(_) | AppError::Io(_) => ErrorCode::InternalError,
        }
    }

    /// Get additional error details if available
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::Incompatible {
                host_version,
                candidates,
                ..
            } => Some(json!({
                "hostVersion": host_version.to_string(),
                "candidates": candidates.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
            })),
            AppError::Storage(StorageError::IndexUpsert { partial, .. }) => {
                serde_json::to_value(partial)
                    .ok()
                    .map(|payload| json!({ "indexPayload": payload }))
            }
            _ => None,
        }
    }

    /// Create a standardized error response
    pub fn to_error_response(&self) -> ApiErrorResponse {
        let code = self.error_code();
        ApiErrorResponse {
            error: self.to_string(),
            code: code.as_str().to_string(),
            details: self.details(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.http_status();

        match code {
            ErrorCode::InternalError | ErrorCode::StorageError => {
                tracing::error!(error = %self, "Request failed")
            }
            _ => tracing::warn!(error = %self, "Request rejected"),
        }

        let error_response = self.to_error_response();
        tracing::debug!(status = %status, code = %error_response.code, "Returning standardized error response");

        (status, axum::Json(error_response)).into_response()
    }
}

/// Convenient result type for application operations.
pub type AppResult<T> = Result<T, AppError>;
