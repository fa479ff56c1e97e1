//! Turns a spreadsheet into one CSV export job per sheet.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::auth::AuthSession;
use crate::client::SheetsApi;
use crate::error::{Result, SheetError};
use crate::models::{ExportJob, SheetDescriptor};

/// Path segment of the interactive editor in a spreadsheet URL.
const EDIT_SEGMENT: &str = "/edit";

/// Tabular export endpoint, expecting the sheet id appended.
const CSV_EXPORT_SEGMENT: &str = "/gviz/tq?tqx=out:csv&gid=";

/// Derive the CSV export URL of one sheet from the spreadsheet's edit URL.
///
/// The last whole `/edit` path segment is replaced by the export endpoint and
/// the sheet id appended as the `gid` parameter. `/edit` only counts as a
/// segment when followed by the end of the URL, `/` or `?`, so an id
/// such as `editXy12` is left alone. A `#fragment` never reaches the server
/// and is dropped. A URL without such a segment is rejected rather than
/// guessed at.
///
/// ```
/// use sheet_loader::exporter::derive_export_url;
///
/// let url = derive_export_url("https://docs.google.com/spreadsheets/d/abc/edit", 42).unwrap();
/// assert_eq!(url, "https://docs.google.com/spreadsheets/d/abc/gviz/tq?tqx=out:csv&gid=42");
/// ```
pub fn derive_export_url(spreadsheet_url: &str, sheet_id: i64) -> Result<String> {
    let spreadsheet_url = spreadsheet_url
        .split_once('#')
        .map_or(spreadsheet_url, |(url, _)| url);
    let start = edit_segment_start(spreadsheet_url).ok_or_else(|| {
        SheetError::InvalidUrlOrId(format!(
            "spreadsheet URL has no {} segment: {}",
            EDIT_SEGMENT, spreadsheet_url
        ))
    })?;

    Ok(format!(
        "{}{}{}{}",
        &spreadsheet_url[..start],
        CSV_EXPORT_SEGMENT,
        &spreadsheet_url[start + EDIT_SEGMENT.len()..],
        sheet_id
    ))
}

/// Byte offset of the last `/edit` that forms a complete path segment.
fn edit_segment_start(url: &str) -> Option<usize> {
    url.match_indices(EDIT_SEGMENT)
        .map(|(start, _)| start)
        .filter(|start| {
            matches!(
                url[start + EDIT_SEGMENT.len()..].chars().next(),
                None | Some('/' | '?')
            )
        })
        .last()
}

/// `{dir}/{stem}.csv`, with path separators in `stem` neutralized.
pub fn destination_path(dir: &Path, stem: &str) -> PathBuf {
    let file_stem: String = stem
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    dir.join(format!("{}.csv", file_stem))
}

/// Lists sheets and plans their exports.
#[derive(Clone)]
pub struct SheetExporter {
    api: Arc<dyn SheetsApi>,
}

impl SheetExporter {
    pub fn new(api: Arc<dyn SheetsApi>) -> Self {
        Self { api }
    }

    /// List the sheets of a spreadsheet.
    pub async fn list_sheets(
        &self,
        session: &AuthSession,
        spreadsheet_id: &str,
    ) -> Result<Vec<SheetDescriptor>> {
        session.bearer()?;
        Ok(self.api.get_spreadsheet(session, spreadsheet_id).await?.sheets)
    }

    /// Plan one export job per sheet.
    ///
    /// With a non-empty `destination_override`, every job writes to the same
    /// `{destination_dir}/{override}.csv`. Later writes replace earlier ones;
    /// choosing a distinct name per run is up to the caller.
    pub async fn plan_exports(
        &self,
        session: &AuthSession,
        spreadsheet_id: &str,
        destination_dir: &Path,
        destination_override: Option<&str>,
    ) -> Result<Vec<ExportJob>> {
        session.bearer()?;
        let spreadsheet = self.api.get_spreadsheet(session, spreadsheet_id).await?;
        let destination_override = destination_override.filter(|name| !name.is_empty());

        if destination_override.is_some() && spreadsheet.sheets.len() > 1 {
            warn!(
                sheets = spreadsheet.sheets.len(),
                "all sheets share one destination file"
            );
        }

        let jobs = spreadsheet
            .sheets
            .into_iter()
            .map(|sheet| -> Result<ExportJob> {
                let export_url = derive_export_url(&spreadsheet.url, sheet.id)?;
                let stem = destination_override.unwrap_or(&sheet.title);
                let destination = destination_path(destination_dir, stem);
                debug!(sheet = %sheet.title, url = %export_url, "planned export");
                Ok(ExportJob {
                    sheet,
                    export_url,
                    destination,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if destination_override.is_none() {
            warn_on_shared_destinations(&jobs);
        }
        Ok(jobs)
    }
}

/// Destinations claimed by more than one job, once per extra claimant.
///
/// Distinct titles can map to the same file once separators are replaced.
fn shared_destinations(jobs: &[ExportJob]) -> Vec<&Path> {
    let mut seen = HashSet::new();
    jobs.iter()
        .map(|job| job.destination.as_path())
        .filter(|destination| !seen.insert(*destination))
        .collect()
}

fn warn_on_shared_destinations(jobs: &[ExportJob]) {
    for destination in shared_destinations(jobs) {
        warn!(
            path = %destination.display(),
            "sheets with different titles share one destination file"
        );
    }
}
