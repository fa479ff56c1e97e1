//! Run configuration.
//!
//! A run is configured from an optional JSON file whose keys follow the
//! camelCase layout below, with command-line flags applied on top:
//!
//! ```json
//! {
//!     "spreadsheetId": "19BQWGzH4q1C0rHNVAzhh5PqaxB655lSNmSGc473vu74",
//!     "downloadDir": "./downloads",
//!     "fileToSave": "report",
//!     "credentialsPath": "credentials.json",
//!     "tokenPath": "token.json",
//!     "scopes": ["https://www.googleapis.com/auth/spreadsheets.readonly"],
//!     "maxConcurrent": 4,
//!     "printJson": true
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::download::DEFAULT_MAX_CONCURRENT;
use crate::error::{Result, SheetError};
use crate::url_parser::extract_id;

/// Scopes requested during consent unless configured otherwise.
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets.readonly",
    "https://www.googleapis.com/auth/drive.readonly",
];

pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_TOKEN_PATH: &str = "token.json";

/// On-disk configuration file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub spreadsheet_id: Option<String>,
    pub download_dir: Option<PathBuf>,
    pub file_to_save: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
    pub scopes: Option<Vec<String>>,
    pub max_concurrent: Option<usize>,
    pub print_json: Option<bool>,
}

/// Complete run configuration. Required values stay optional here so that a
/// missing one can be reported by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub spreadsheet_id: Option<String>,
    pub destination_dir: Option<PathBuf>,
    pub destination_file: Option<String>,
    pub credentials_path: PathBuf,
    pub token_path: PathBuf,
    pub scopes: Vec<String>,
    pub max_concurrent: usize,
    pub print_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            destination_dir: None,
            destination_file: None,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            print_json: false,
        }
    }
}

/// The validated part of a [`Config`] that identifies what to export where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub spreadsheet_id: String,
    pub destination_dir: PathBuf,
    pub destination_file: Option<String>,
}

impl Config {
    /// Load a JSON configuration file, filling unset keys with defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SheetError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: FileConfig = serde_json::from_str(json)
            .map_err(|e| SheetError::Config(format!("invalid config file: {}", e)))?;
        Ok(Self::default().merge(file))
    }

    /// Apply every value set in `file` on top of `self`.
    pub fn merge(mut self, file: FileConfig) -> Self {
        if file.spreadsheet_id.is_some() {
            self.spreadsheet_id = file.spreadsheet_id;
        }
        if file.download_dir.is_some() {
            self.destination_dir = file.download_dir;
        }
        if file.file_to_save.is_some() {
            self.destination_file = file.file_to_save;
        }
        if let Some(path) = file.credentials_path {
            self.credentials_path = path;
        }
        if let Some(path) = file.token_path {
            self.token_path = path;
        }
        if let Some(scopes) = file.scopes {
            self.scopes = scopes;
        }
        if let Some(max_concurrent) = file.max_concurrent {
            self.max_concurrent = max_concurrent;
        }
        if let Some(print_json) = file.print_json {
            self.print_json = print_json;
        }
        self
    }

    /// The spreadsheet id, extracted from a URL if one was given.
    pub fn require_spreadsheet_id(&self) -> Result<String> {
        let raw_id = self
            .spreadsheet_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SheetError::Config("spreadsheet id is missing".to_string()))?;

        extract_id(raw_id)
            .map_err(|_| SheetError::Config(format!("invalid spreadsheet id: {}", raw_id)))
    }

    /// Check required values. Performs no I/O.
    pub fn validate(&self) -> Result<ExportTarget> {
        let spreadsheet_id = self.require_spreadsheet_id()?;

        let destination_dir = self
            .destination_dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| SheetError::Config("destination directory is missing".to_string()))?;

        if self.scopes.is_empty() {
            return Err(SheetError::Config("at least one scope is required".to_string()));
        }
        if self.max_concurrent == 0 {
            return Err(SheetError::Config(
                "max concurrent downloads must be at least 1".to_string(),
            ));
        }

        Ok(ExportTarget {
            spreadsheet_id,
            destination_dir,
            destination_file: self
                .destination_file
                .clone()
                .filter(|name| !name.is_empty()),
        })
    }
}
