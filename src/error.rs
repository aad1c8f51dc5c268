//! Exit codes and structured error output.

use serde::Serialize;

use crate::batch::RunReport;
use crate::duplicates::{FinderError, ScanSummary};

/// Process exit codes.
///
/// - 0: Success (completed, duplicates found or hash pass clean)
/// - 1: General error
/// - 2: No duplicates found
/// - 3: Partial success (item errors or failed batches)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Completed normally.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Detection completed but found no duplicates.
    NoDuplicates = 2,
    /// Completed with non-fatal item or batch failures.
    PartialSuccess = 3,
    /// Stopped by Ctrl+C.
    Interrupted = 130,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DW000",
            Self::GeneralError => "DW001",
            Self::NoDuplicates => "DW002",
            Self::PartialSuccess => "DW003",
            Self::Interrupted => "DW130",
        }
    }

    /// Exit code for a finished detection run.
    ///
    /// An interrupted scan never finishes; it surfaces as
    /// [`FinderError::Interrupted`] and maps through [`ExitCode::for_error`].
    #[must_use]
    pub fn for_scan(group_count: usize, summary: &ScanSummary) -> Self {
        if summary.has_errors() {
            Self::PartialSuccess
        } else if group_count == 0 {
            Self::NoDuplicates
        } else {
            Self::Success
        }
    }

    /// Exit code for a finished hash pass.
    #[must_use]
    pub fn for_run(report: &RunReport) -> Self {
        if report.interrupted {
            Self::Interrupted
        } else if report.has_failures() {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }

    /// Exit code for an error that ended the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Error report printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Machine-readable code (e.g. "DW001")
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Human-readable message, including causes
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Describe `err` ending the run with `exit_code`.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
