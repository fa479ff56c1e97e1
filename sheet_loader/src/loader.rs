//! One export run: validate, authorize, plan, download.

use std::sync::Arc;

use tracing::info;

use crate::auth::{Authorizer, ConsentPrompt};
use crate::client::{SheetsApi, SheetsClient};
use crate::config::Config;
use crate::download::DownloadCoordinator;
use crate::error::{Result, SheetError};
use crate::exporter::SheetExporter;
use crate::models::{Credentials, ExportOutcome, SheetDescriptor};
use crate::oauth::{GoogleOAuth, IdentityProvider};
use crate::token_store::{FileTokenStore, TokenStore};

/// Wires the authorizer, exporter and download coordinator together.
pub struct SheetLoader {
    authorizer: Authorizer,
    exporter: SheetExporter,
    downloader: DownloadCoordinator,
}

impl SheetLoader {
    pub fn new(
        authorizer: Authorizer,
        exporter: SheetExporter,
        downloader: DownloadCoordinator,
    ) -> Self {
        Self {
            authorizer,
            exporter,
            downloader,
        }
    }

    /// Build a loader talking to Google, with the token cached on disk.
    pub fn from_config(config: &Config, consent: Arc<dyn ConsentPrompt>) -> Result<Self> {
        let credentials = Credentials::from_file(&config.credentials_path)?;

        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.token_path));
        let provider: Arc<dyn IdentityProvider> = Arc::new(GoogleOAuth::new());
        let api: Arc<dyn SheetsApi> = Arc::new(SheetsClient::new());

        Ok(Self::new(
            Authorizer::new(credentials, config.scopes.clone(), store, provider, consent),
            SheetExporter::new(api),
            DownloadCoordinator::new().with_max_concurrent(config.max_concurrent),
        ))
    }

    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// List the sheets of the configured spreadsheet.
    pub async fn list_sheets(&self, config: &Config) -> Result<Vec<SheetDescriptor>> {
        let spreadsheet_id = config.require_spreadsheet_id()?;
        let session = self.authorizer.authorize().await?;
        self.exporter.list_sheets(&session, &spreadsheet_id).await
    }

    /// Export every sheet of the configured spreadsheet.
    ///
    /// Configuration, authorization and metadata errors abort the run. Once
    /// downloads start, each sheet's result is reported in its own outcome.
    pub async fn load_data(&self, config: &Config) -> Result<Vec<ExportOutcome>> {
        let target = config.validate()?;
        let session = self.authorizer.authorize().await?;

        let jobs = self
            .exporter
            .plan_exports(
                &session,
                &target.spreadsheet_id,
                &target.destination_dir,
                target.destination_file.as_deref(),
            )
            .await?;
        info!(spreadsheet = %target.spreadsheet_id, sheets = jobs.len(), "planned exports");

        tokio::fs::create_dir_all(&target.destination_dir)
            .await
            .map_err(|e| {
                SheetError::Config(format!(
                    "cannot create destination directory {}: {}",
                    target.destination_dir.display(),
                    e
                ))
            })?;

        Ok(self.downloader.run_all(&session, jobs).await)
    }
}
