//! URL parser for extracting spreadsheet IDs from Google Sheets URLs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, SheetError};

/// `https://docs.google.com/spreadsheets/d/<ID>/...`, optionally with a `/u/<n>/` account segment.
static SPREADSHEET_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://docs\.google\.com/spreadsheets/(?:u/\d+/)?d/([a-zA-Z0-9_-]+)")
        .expect("Invalid spreadsheet URL regex")
});

/// Valid spreadsheet ID pattern (alphanumeric, underscore, hyphen).
static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Extract a spreadsheet ID from a URL or validate a raw ID.
///
/// Supports the following formats:
/// - `https://docs.google.com/spreadsheets/d/<ID>/edit#gid=0`
/// - `https://docs.google.com/spreadsheets/u/0/d/<ID>/edit`
/// - Raw ID string
///
/// # Examples
///
/// ```
/// use sheet_loader::url_parser::extract_id;
///
/// let id = extract_id("https://docs.google.com/spreadsheets/d/1abc123/edit").unwrap();
/// assert_eq!(id, "1abc123");
///
/// let id = extract_id("1abc123").unwrap();
/// assert_eq!(id, "1abc123");
/// ```
pub fn extract_id(url_or_id: &str) -> Result<String> {
    let trimmed = url_or_id.trim();

    if let Some(id) = SPREADSHEET_URL_REGEX
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
    {
        return Ok(id.as_str().to_string());
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(SheetError::InvalidUrlOrId(url_or_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_edit_url() {
        let url = "https://docs.google.com/spreadsheets/d/19BQWGzH4q1C0rHNVAzhh5PqaxB655lSNmSGc473vu74/edit";
        assert_eq!(
            extract_id(url).unwrap(),
            "19BQWGzH4q1C0rHNVAzhh5PqaxB655lSNmSGc473vu74"
        );
    }

    #[test]
    fn test_extract_raw_id() {
        assert_eq!(extract_id("abc-123_XYZ").unwrap(), "abc-123_XYZ");
    }

    #[test]
    fn test_invalid_input() {
        assert!(extract_id("").is_err());
        assert!(extract_id("https://drive.google.com/file/d/1abc/view").is_err());
    }
}
