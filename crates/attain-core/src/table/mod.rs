//! Tabular data source
//!
//! Every input (gradebook export, outcome definitions, criteria and weight
//! mappings) is a headed CSV table. [`Table`] holds the raw text; the
//! readers in [`readers`] turn it into typed inputs for the engine.

pub mod readers;

use std::io::Read;
use std::path::Path;

use crate::error::{AttainError, Result};
use crate::text::canonical_name;

pub use readers::{
    read_aliases, read_criteria, read_grades, read_outcome_definitions, read_weights,
    AliasTable, CriteriaTable, GradeBook, RawWeights, StudentId,
};

/// A headed table of trimmed text cells
#[derive(Debug, Clone)]
pub struct Table {
    location: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Read a CSV file from disk
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AttainError::FileNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)
            .map_err(|e| AttainError::io_operation("open", path.display(), e))?;
        Self::from_reader(file, path.display().to_string())
    }

    /// Read CSV from any reader; `location` names the source in errors
    pub fn from_reader<R: Read>(reader: R, location: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if headers.iter().all(String::is_empty) {
            return Err(AttainError::missing_input("header row", &location));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        tracing::trace!(location = %location, columns = headers.len(), rows = rows.len(), "table_read");

        Ok(Self {
            location,
            headers,
            rows,
        })
    }

    /// Where the table came from (file path or test label)
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Find a column by name, ignoring case and decoration
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = canonical_name(name).to_lowercase();
        self.headers
            .iter()
            .position(|h| canonical_name(h).to_lowercase() == wanted)
    }

    /// Cell text, or `""` when the row is short
    pub fn cell(row: &[String], column: usize) -> &str {
        row.get(column).map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_headers_and_skips_blank_rows() {
        let csv = "Outcome, Quiz 1 ,Lab\nCO-1,x,\n,,\nCO-2,,x\n";
        let table = Table::from_reader(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.headers(), ["Outcome", "Quiz 1", "Lab"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(Table::cell(&table.rows()[1], 2), "x");
        assert_eq!(Table::cell(&table.rows()[1], 7), "");
    }

    #[test]
    fn test_column_lookup_ignores_case_and_qualifiers() {
        let csv = "Student,SIS User ID,Quiz 1 (5531)\n";
        let table = Table::from_reader(csv.as_bytes(), "inline").unwrap();
        assert_eq!(table.column_index("sis user id"), Some(1));
        assert_eq!(table.column_index("Quiz 1"), Some(2));
        assert_eq!(table.column_index("Quiz 2"), None);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = Table::read(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, AttainError::FileNotFound(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let err = Table::from_reader("".as_bytes(), "empty.csv").unwrap_err();
        assert!(matches!(err, AttainError::MissingInput { .. }));
    }
}
