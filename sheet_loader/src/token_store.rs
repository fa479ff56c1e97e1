//! Persisted OAuth token storage.
//!
//! The token lives in a single JSON file. A missing or unparsable file is a
//! normal state (the user simply has to go through consent again); a file that
//! exists but cannot be read is reported as [`SheetError::TokenStoreUnavailable`].

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, SheetError};
use crate::models::Token;

/// Storage slot for the single cached token of this application.
pub trait TokenStore: Send + Sync {
    /// Read the persisted token. `Ok(None)` when there is nothing usable.
    fn load(&self) -> Result<Option<Token>>;

    /// Overwrite the persisted token. Returns only once the data is durable.
    fn save(&self, token: &Token) -> Result<()>;
}

/// [`TokenStore`] backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_durably(&self, content: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = File::create(&temp_path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        let written = file
            .write_all(content)
            .and_then(|_| file.sync_all())
            .and_then(|_| fs::rename(&temp_path, &self.path));

        if written.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        written
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Token>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no cached token");
                return Ok(None);
            }
            Err(e) => {
                return Err(SheetError::TokenStoreUnavailable(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<Token>(&content) {
            Ok(token) => {
                debug!(path = %self.path.display(), "loaded cached token");
                Ok(Some(token))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unparsable token file");
                Ok(None)
            }
        }
    }

    fn save(&self, token: &Token) -> Result<()> {
        let content = serde_json::to_vec(token)?;
        self.write_durably(&content).map_err(|e| {
            SheetError::Persistence(format!("{}: {}", self.path.display(), e))
        })?;

        info!(path = %self.path.display(), "token stored");
        Ok(())
    }
}
