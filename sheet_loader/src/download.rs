//! Concurrent CSV downloads with per-job failure isolation.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use reqwest::{redirect, Client, Response, StatusCode};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::auth::AuthSession;
use crate::error::JobError;
use crate::models::{ExportJob, ExportOutcome};

/// Default number of exports in flight at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Fetches export URLs and streams each body to its destination file.
#[derive(Debug, Clone)]
pub struct DownloadCoordinator {
    http: Client,
    max_concurrent: usize,
}

impl DownloadCoordinator {
    pub fn new() -> Self {
        // An export behind an expired credential redirects to a sign-in page;
        // following it would save that page as the sheet.
        let http = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Limit the number of simultaneous downloads (at least one).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run every job and wait for all of them.
    ///
    /// Jobs overlap on the calling task; none of them can abort another.
    /// `outcomes[i]` is the result of `jobs[i]`.
    pub async fn run_all(&self, session: &AuthSession, jobs: Vec<ExportJob>) -> Vec<ExportOutcome> {
        info!(jobs = jobs.len(), "starting exports");

        stream::iter(jobs.into_iter().enumerate())
            .map(|(index, job)| async move { self.run_one(session, index, &job).await })
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    async fn run_one(&self, session: &AuthSession, index: usize, job: &ExportJob) -> ExportOutcome {
        match self.download(session, index, job).await {
            Ok(bytes) => {
                info!(
                    sheet = %job.sheet.title,
                    path = %job.destination.display(),
                    bytes,
                    "sheet exported"
                );
                ExportOutcome::succeeded(job, bytes)
            }
            Err(e) => {
                warn!(sheet = %job.sheet.title, error = %e, "sheet export failed");
                ExportOutcome::failed(job, e)
            }
        }
    }

    async fn download(
        &self,
        session: &AuthSession,
        index: usize,
        job: &ExportJob,
    ) -> Result<u64, JobError> {
        let token = session.bearer().map_err(|_| JobError::AuthExpired)?;

        debug!(url = %job.export_url, "requesting export");
        let response = self
            .http
            .get(&job.export_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| JobError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status.is_redirection() {
            debug!(%status, url = %job.export_url, "export requires sign-in");
            return Err(JobError::AuthExpired);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(JobError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let temp_path = part_path(&job.destination, index);
        let written = write_atomically(response, &temp_path, &job.destination).await;
        if written.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        written
    }
}

impl Default for DownloadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Temporary sibling of `destination`, unique per job.
fn part_path(destination: &Path, index: usize) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(format!(".{}.part", index));
    PathBuf::from(name)
}

fn write_error(path: &Path, e: std::io::Error) -> JobError {
    JobError::Write(format!("{}: {}", path.display(), e))
}

/// Stream the body into `temp_path`, sync it, then rename onto `destination`.
async fn write_atomically(
    response: Response,
    temp_path: &Path,
    destination: &Path,
) -> Result<u64, JobError> {
    let mut file = File::create(temp_path)
        .await
        .map_err(|e| write_error(temp_path, e))?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| JobError::Network(e.to_string()))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| write_error(temp_path, e))?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| write_error(temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| write_error(temp_path, e))?;
    drop(file);

    fs::rename(temp_path, destination)
        .await
        .map_err(|e| write_error(destination, e))?;

    Ok(written)
}
