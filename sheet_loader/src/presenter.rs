//! Render exported CSV files as JSON.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::models::ExportOutcome;

/// Parse a CSV file into an array of row objects keyed by the header row.
///
/// Rows shorter than the header omit the missing keys; extra cells are
/// dropped. Blank header cells are named `field1`, `field2`, ... by position.
pub fn csv_to_json<P: AsRef<Path>>(path: P) -> Result<Value> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path.as_ref())?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if name.trim().is_empty() {
                format!("field{}", i + 1)
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.clone(), Value::String(cell.to_string())))
            .collect();
        rows.push(Value::Object(row));
    }

    Ok(Value::Array(rows))
}

/// Pretty-print JSON with four-space indentation.
pub fn to_pretty_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Convert a saved CSV file into its printable JSON form.
pub fn render_file<P: AsRef<Path>>(path: P) -> Result<String> {
    to_pretty_json(&csv_to_json(path)?)
}

/// Files written by successful outcomes, each listed once in first-seen order.
///
/// Outcomes sharing a destination file would otherwise echo it repeatedly.
pub fn written_files(outcomes: &[ExportOutcome]) -> Vec<&Path> {
    let mut seen = HashSet::new();
    outcomes
        .iter()
        .filter(|outcome| outcome.is_success())
        .map(|outcome| outcome.destination.as_path())
        .filter(|path| seen.insert(*path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::error::JobError;
    use crate::models::SheetDescriptor;
    use std::path::PathBuf;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_rows_keyed_by_header() {
        let file = csv_file("\"Item\",\"Cost\"\n\"Rent\",\"1200\"\n\"Food\",\"300\"\n");
        let value = csv_to_json(file.path()).unwrap();
        assert_eq!(
            value,
            json!([
                {"Item": "Rent", "Cost": "1200"},
                {"Item": "Food", "Cost": "300"}
            ])
        );
    }

    #[test]
    fn test_short_rows_and_blank_headers() {
        let file = csv_file("Name,,Notes\nAda,36\n");
        let value = csv_to_json(file.path()).unwrap();
        assert_eq!(value, json!([{"Name": "Ada", "field2": "36"}]));
    }

    #[test]
    fn test_header_only_file_is_empty_array() {
        let file = csv_file("A,B\n");
        assert_eq!(csv_to_json(file.path()).unwrap(), json!([]));
    }

    #[test]
    fn test_four_space_indent() {
        let rendered = to_pretty_json(&json!([{"A": "1"}])).unwrap();
        assert_eq!(rendered, "[\n    {\n        \"A\": \"1\"\n    }\n]");
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(render_file("/nonexistent/sheet.csv").is_err());
    }

    fn outcome(id: i64, destination: &str, error: Option<JobError>) -> ExportOutcome {
        ExportOutcome {
            sheet: SheetDescriptor::new(id, format!("Sheet{}", id)),
            destination: PathBuf::from(destination),
            bytes_written: 0,
            error,
        }
    }

    #[test]
    fn test_written_files_are_listed_once() {
        let outcomes = vec![
            outcome(0, "/out/report.csv", None),
            outcome(1, "/out/report.csv", None),
            outcome(2, "/out/other.csv", Some(JobError::AuthExpired)),
            outcome(3, "/out/last.csv", None),
        ];

        assert_eq!(
            written_files(&outcomes),
            vec![Path::new("/out/report.csv"), Path::new("/out/last.csv")]
        );
    }
}
