//! JSON output for detection results and hash-pass reports.
//!
//! # Detection schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     { "hash": "abc123...", "size": 1024, "wasted_space": 1024,
//!       "files": ["/path/a.txt", "/path/b.txt"] }
//!   ],
//!   "summary": {
//!     "total_files": 100, "duplicate_groups": 5, "reclaimable_space": 51200,
//!     "scan_duration_ms": 1234, "exit_code": 0, "exit_code_name": "DW000"
//!   }
//! }
//! ```
//!
//! The hash-pass report is [`HashPassReport`] serialized as-is, plus the
//! exit code.

use std::io::Write;

use serde::Serialize;

use crate::batch::HashPassReport;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// One duplicate group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Exact content hash (64 hex characters)
    pub hash: String,
    /// Size of each member in bytes
    pub size: u64,
    /// Bytes held by redundant copies
    pub wasted_space: u64,
    /// Member paths, absolute where they can be resolved
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Convert a [`DuplicateGroup`].
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash.clone(),
            size: group.size,
            wasted_space: group.wasted_space(),
            files: group
                .files
                .iter()
                .map(|f| normalize_path(f.path.as_path()))
                .collect(),
        }
    }
}

/// Detection summary.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Records considered
    pub total_files: usize,
    /// Bytes across all records
    pub total_size: u64,
    /// Records dropped by size bucketing
    pub eliminated_by_size: usize,
    /// Records dropped by the quick hash
    pub eliminated_by_quick_hash: usize,
    /// Records full-hashed
    pub full_hashed: usize,
    /// Confirmed groups
    pub duplicate_groups: usize,
    /// Redundant copies
    pub duplicate_files: usize,
    /// Bytes reclaimable
    pub reclaimable_space: u64,
    /// Item errors recorded
    pub errors: usize,
    /// Wall-clock duration in milliseconds
    pub scan_duration_ms: u64,
    /// Numeric exit code
    pub exit_code: i32,
    /// Machine-readable exit code name
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Convert a [`ScanSummary`].
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            eliminated_by_size: summary.eliminated_by_size,
            eliminated_by_quick_hash: summary.eliminated_by_quick_hash,
            full_hashed: summary.full_hashed,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            errors: summary.scan_errors.len(),
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete detection output.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups, largest waste first
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the output for a finished scan.
    #[must_use]
    pub fn new(groups: &[DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(JsonDuplicateGroup::from_duplicate_group)
                .collect(),
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to a compact string.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to a pretty-printed string.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to `writer` followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// Hash-pass report with its exit code.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRunReport<'a> {
    /// The report
    #[serde(flatten)]
    pub report: &'a HashPassReport,
    /// Numeric exit code
    pub exit_code: i32,
    /// Machine-readable exit code name
    pub exit_code_name: &'static str,
}

impl<'a> JsonRunReport<'a> {
    /// Wrap a report.
    #[must_use]
    pub fn new(report: &'a HashPassReport, exit_code: ExitCode) -> Self {
        Self {
            report,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Write to `writer` followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

/// Canonical path string, or the path as given if it no longer resolves.
fn normalize_path(path: &std::path::Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
