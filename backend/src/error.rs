//! Error handling for the medicine inventory server
//!
//! Every error leaves the server as `{ "error": { "code", "message", "field"? } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{LedgerError, StoreError};
use thiserror::Error;

use crate::services::spreadsheet::SpreadsheetError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Ledger errors
    #[error("No valid data found in the imported file")]
    EmptyImport,

    #[error("No data to export")]
    NothingToExport,

    #[error("Invalid spreadsheet: {0}")]
    InvalidSpreadsheet(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        let detail = |code: &str, message: String, field: Option<String>| ErrorDetail {
            code: code.to_string(),
            message,
            field,
        };
        match self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                detail("VALIDATION_ERROR", message.clone(), Some(field.clone())),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                detail("VALIDATION_ERROR", msg.clone(), None),
            ),
            AppError::ConfirmationRequired(action) => (
                StatusCode::PRECONDITION_REQUIRED,
                detail(
                    "CONFIRMATION_REQUIRED",
                    format!("Confirm before {}: repeat the request with confirm=true", action),
                    Some("confirm".to_string()),
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                detail("NOT_FOUND", format!("{} not found", resource), None),
            ),
            AppError::EmptyImport => (
                StatusCode::UNPROCESSABLE_ENTITY,
                detail("EMPTY_IMPORT", "No valid data found in Excel file!".to_string(), None),
            ),
            AppError::NothingToExport => (
                StatusCode::UNPROCESSABLE_ENTITY,
                detail("NOTHING_TO_EXPORT", "No data to export!".to_string(), None),
            ),
            AppError::InvalidSpreadsheet(msg) => (
                StatusCode::BAD_REQUEST,
                detail(
                    "INVALID_SPREADSHEET",
                    format!("Failed to import Excel file. Please check the format. ({})", msg),
                    None,
                ),
            ),
            AppError::Export(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("EXPORT_ERROR", format!("Export failed: {}", msg), None),
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                detail("STORAGE_ERROR", format!("Storage error: {}", msg), None),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail("INTERNAL_ERROR", msg.clone(), None),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(id) => AppError::NotFound(format!("Medicine {}", id)),
            LedgerError::Validation { field, message } => AppError::Validation {
                field: field.to_string(),
                message: message.to_string(),
            },
            LedgerError::EmptyImport => AppError::EmptyImport,
            LedgerError::NothingToExport => AppError::NothingToExport,
            LedgerError::Export(msg) => AppError::Export(msg),
            LedgerError::Storage(err) => err.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StorageError(err.to_string())
    }
}

impl From<SpreadsheetError> for AppError {
    fn from(err: SpreadsheetError) -> Self {
        match err {
            SpreadsheetError::Read(msg) | SpreadsheetError::NoSheets(msg) => AppError::InvalidSpreadsheet(msg),
            SpreadsheetError::Write(err) => AppError::Export(err.to_string()),
            SpreadsheetError::Io(err) => AppError::Export(err.to_string()),
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_errors_map_to_http_statuses() {
        let (status, detail) = AppError::from(LedgerError::NotFound(7)).status_and_detail();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(detail.message, "Medicine 7 not found");

        let (status, detail) = AppError::from(LedgerError::EmptyImport).status_and_detail();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail.code, "EMPTY_IMPORT");
    }

    #[test]
    fn confirmation_points_at_the_flag() {
        let (status, detail) = AppError::ConfirmationRequired("ending the day".to_string()).status_and_detail();
        assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(detail.field.as_deref(), Some("confirm"));
    }
}
