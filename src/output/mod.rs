//! Output formatters for detection results and hash-pass reports.
//!
//! - [`json`] for automation and scripting
//! - [`csv`] for spreadsheet import
//! - [`text`] for terminal summaries
//!
//! # Example
//!
//! ```no_run
//! use dupewave::duplicates::DuplicateFinder;
//! use dupewave::error::ExitCode;
//! use dupewave::output::json::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(&groups, &summary, ExitCode::for_scan(groups.len(), &summary));
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

pub use self::csv::CsvOutput;
pub use json::{JsonOutput, JsonRunReport};
pub use text::{write_run_report, write_scan_report};
