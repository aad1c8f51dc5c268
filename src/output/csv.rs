//! CSV output, one row per duplicate file.
//!
//! # Columns
//!
//! - `group_id`: 1-based group number, in report order
//! - `hash`: exact content hash (hex)
//! - `path`: file path
//! - `size`: file size in bytes
//! - `modified`: last modification time of the record (RFC 3339)

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    hash: &'a str,
    path: String,
    size: u64,
    modified: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self { groups }
    }

    /// Write all rows, with a header, to `writer`.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            for file in &group.files {
                let modified: DateTime<Utc> = file.modified.into();
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    hash: &group.hash,
                    path: file.path.to_string_lossy().into_owned(),
                    size: group.size,
                    modified: modified.to_rfc3339(),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Render to a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::FileRecord;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn group(paths: &[&str]) -> DuplicateGroup {
        DuplicateGroup::new(
            "0".repeat(64),
            7,
            paths
                .iter()
                .map(|p| FileRecord::new(PathBuf::from(p), 7, SystemTime::UNIX_EPOCH))
                .collect(),
        )
    }

    #[test]
    fn test_csv_output_basic() {
        let groups = vec![group(&["/d/file1.txt", "/d/file2.txt"])];
        let csv_str = CsvOutput::new(&groups).to_string().unwrap();

        assert!(csv_str.starts_with("group_id,hash,path,size,modified"));
        assert!(csv_str.contains(&format!("1,{},/d/file1.txt,7,1970-01-01T00:00:00+00:00", "0".repeat(64))));
        assert_eq!(csv_str.lines().count(), 3);
    }

    #[test]
    fn test_csv_output_quoting() {
        let groups = vec![group(&["/d/file,with,comma.txt", "/d/x"])];
        let csv_str = CsvOutput::new(&groups).to_string().unwrap();
        assert!(csv_str.contains("\"/d/file,with,comma.txt\""));
    }

    #[test]
    fn test_csv_output_empty_has_no_rows() {
        let csv_str = CsvOutput::new(&[]).to_string().unwrap();
        assert!(csv_str.is_empty());
    }
}
