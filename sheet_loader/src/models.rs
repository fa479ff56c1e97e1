//! Data models for credentials, tokens and Google Sheets API responses.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{JobError, Result, SheetError};

/// Tokens are treated as expired this long before their actual expiry.
const EXPIRY_SKEW_MS: i64 = 60_000;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// OAuth client credential bundle as downloaded from the Google Cloud Console.
///
/// Web applications carry a `web` section, desktop applications an
/// `installed` section. Both share the same shape.
#[derive(Debug, Deserialize)]
pub struct CredentialsFile {
    #[serde(default)]
    pub web: Option<ClientSecrets>,
    #[serde(default)]
    pub installed: Option<ClientSecrets>,
}

/// One section of the credential bundle.
#[derive(Debug, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Application credentials used for the consent flow and token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Credentials {
    /// Load credentials from a credential bundle on disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SheetError::CredentialsMalformed(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse a credential bundle. The first redirect URI is used.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| SheetError::CredentialsMalformed(e.to_string()))?;

        let secrets = file.web.or(file.installed).ok_or_else(|| {
            SheetError::CredentialsMalformed("missing 'web' or 'installed' section".to_string())
        })?;

        if secrets.client_id.trim().is_empty() {
            return Err(SheetError::CredentialsMalformed("empty client_id".to_string()));
        }
        if secrets.client_secret.trim().is_empty() {
            return Err(SheetError::CredentialsMalformed(
                "empty client_secret".to_string(),
            ));
        }

        let redirect_uri = secrets.redirect_uris.into_iter().next().ok_or_else(|| {
            SheetError::CredentialsMalformed("redirect_uris must not be empty".to_string())
        })?;

        Ok(Self {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
            redirect_uri,
        })
    }
}

/// Persisted OAuth token, in the layout the Google client libraries write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl Token {
    /// Build a token from a token endpoint response.
    ///
    /// Refresh responses usually omit the refresh token, so the previous one
    /// is carried over.
    pub fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            scope: response.scope,
            token_type: response.token_type,
            expiry_date: response
                .expires_in
                .map(|secs| now_millis().saturating_add(secs.saturating_mul(1000))),
        }
    }

    /// Carries an access token that has not expired.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// A token without an expiry is trusted until the provider rejects it.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => now_ms + EXPIRY_SKEW_MS >= expiry,
            None => false,
        }
    }
}

/// OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// OAuth2 token endpoint error body.
#[derive(Debug, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// One sheet (tab) inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDescriptor {
    pub id: i64,
    pub title: String,
}

impl SheetDescriptor {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

impl std::fmt::Display for SheetDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.id, self.title)
    }
}

/// Snapshot of a spreadsheet's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub id: String,
    /// Interactive edit URL, e.g. `https://docs.google.com/spreadsheets/d/<id>/edit`.
    pub url: String,
    pub sheets: Vec<SheetDescriptor>,
}

/// Response from the spreadsheets.get API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetResponse {
    pub spreadsheet_id: String,
    pub spreadsheet_url: String,
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SheetEntry {
    pub properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

impl From<SpreadsheetResponse> for Spreadsheet {
    fn from(response: SpreadsheetResponse) -> Self {
        Self {
            id: response.spreadsheet_id,
            url: response.spreadsheet_url,
            sheets: response
                .sheets
                .into_iter()
                .map(|entry| SheetDescriptor::new(entry.properties.sheet_id, entry.properties.title))
                .collect(),
        }
    }
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Unit of work: export one sheet to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub sheet: SheetDescriptor,
    pub export_url: String,
    pub destination: PathBuf,
}

/// Terminal result of one [`ExportJob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub sheet: SheetDescriptor,
    pub destination: PathBuf,
    pub bytes_written: u64,
    pub error: Option<JobError>,
}

impl ExportOutcome {
    pub fn succeeded(job: &ExportJob, bytes_written: u64) -> Self {
        Self {
            sheet: job.sheet.clone(),
            destination: job.destination.clone(),
            bytes_written,
            error: None,
        }
    }

    pub fn failed(job: &ExportJob, error: JobError) -> Self {
        Self {
            sheet: job.sheet.clone(),
            destination: job.destination.clone(),
            bytes_written: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
