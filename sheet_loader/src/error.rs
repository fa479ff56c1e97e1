//! Error types for the sheet_loader crate.

use thiserror::Error;

/// Errors that abort a run.
///
/// Everything before the downloads start (configuration, credentials,
/// authorization, spreadsheet metadata) surfaces as a `SheetError`. Failures of
/// individual sheet downloads are reported per sheet as [`JobError`] instead.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed credentials: {0}")]
    CredentialsMalformed(String),

    #[error("Token store unavailable: {0}")]
    TokenStoreUnavailable(String),

    #[error("Failed to persist token: {0}")]
    Persistence(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not authorized: authorize before accessing the spreadsheet")]
    NotAuthorized,

    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Terminal failure of a single export job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("network error: {0}")]
    Network(String),

    #[error("export failed ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("write error: {0}")]
    Write(String),

    #[error("access token expired")]
    AuthExpired,
}

/// Result type alias for SheetError.
pub type Result<T> = std::result::Result<T, SheetError>;
