//! Google Sheets API client for spreadsheet metadata.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::auth::AuthSession;
use crate::error::{Result, SheetError};
use crate::models::{ApiErrorResponse, Spreadsheet, SpreadsheetResponse};

/// Base URL for Google Sheets API v4.
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Only the fields needed to plan exports.
const SPREADSHEET_FIELDS: &str = "spreadsheetId,spreadsheetUrl,sheets.properties(sheetId,title)";

/// Spreadsheet metadata lookup.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Fetch the spreadsheet's URL and the list of its sheets.
    async fn get_spreadsheet(
        &self,
        session: &AuthSession,
        spreadsheet_id: &str,
    ) -> Result<Spreadsheet>;
}

/// Client for the Google Sheets REST API.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    base_url: String,
    http: Client,
}

impl SheetsClient {
    pub fn new() -> Self {
        Self::with_base_url(SHEETS_API_BASE)
    }

    /// Create a client against a custom API root (e.g. a mock server).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for SheetsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn get_spreadsheet(
        &self,
        session: &AuthSession,
        spreadsheet_id: &str,
    ) -> Result<Spreadsheet> {
        let token = session.bearer()?;

        let response = self
            .http
            .get(format!("{}/spreadsheets/{}", self.base_url, spreadsheet_id))
            .bearer_auth(token)
            .query(&[("includeGridData", "false"), ("fields", SPREADSHEET_FIELDS)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(api_error(spreadsheet_id, response).await);
        }

        let body: SpreadsheetResponse = response.json().await?;
        let spreadsheet = Spreadsheet::from(body);
        debug!(
            spreadsheet = %spreadsheet.id,
            sheets = spreadsheet.sheets.len(),
            "fetched spreadsheet metadata"
        );
        Ok(spreadsheet)
    }
}

/// Map a non-success response to the matching error.
async fn api_error(spreadsheet_id: &str, response: Response) -> SheetError {
    let status = response.status();
    let error_body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&error_body) {
        Ok(api_error) => api_error.error.message,
        Err(_) => error_body,
    };

    match status {
        StatusCode::NOT_FOUND => SheetError::SpreadsheetNotFound(spreadsheet_id.to_string()),
        StatusCode::FORBIDDEN => SheetError::PermissionDenied(message),
        StatusCode::UNAUTHORIZED => SheetError::NotAuthorized,
        _ => SheetError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}
