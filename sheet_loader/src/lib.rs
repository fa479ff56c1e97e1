//! sheet_loader - export every sheet of a Google Spreadsheet as CSV.
//!
//! This library provides functionality to:
//! - Authorize with OAuth2, reusing a cached token when it is still valid
//! - List the sheets of a spreadsheet and derive their CSV export URLs
//! - Download all sheets concurrently, reporting each file's outcome
//! - Render the saved CSV files as JSON
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sheet_loader::{Config, SheetLoader, StdinConsent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.json")?;
//!     let loader = SheetLoader::from_config(&config, Arc::new(StdinConsent))?;
//!
//!     for outcome in loader.load_data(&config).await? {
//!         println!("{} ok={}", outcome.destination.display(), outcome.is_success());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod exporter;
pub mod loader;
pub mod logging;
pub mod models;
pub mod oauth;
pub mod presenter;
pub mod token_store;
pub mod url_parser;

// Re-exports for convenience
pub use auth::{AuthSession, AuthState, Authorizer, ConsentPrompt, StdinConsent};
pub use client::{SheetsApi, SheetsClient};
pub use config::{Config, ExportTarget};
pub use download::DownloadCoordinator;
pub use error::{JobError, Result, SheetError};
pub use exporter::{derive_export_url, SheetExporter};
pub use loader::SheetLoader;
pub use models::{Credentials, ExportJob, ExportOutcome, SheetDescriptor, Token};
pub use oauth::{GoogleOAuth, IdentityProvider};
pub use token_store::{FileTokenStore, TokenStore};
pub use url_parser::extract_id;
