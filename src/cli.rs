//! Command-line interface definitions.
//!
//! Global options (verbosity, color, config file) plus one subcommand per
//! entry point of the pipeline.
//!
//! # Example
//!
//! ```bash
//! # Detect duplicates directly
//! dupewave scan ~/Downloads --min-size 1MB --output json
//!
//! # Store an inventory, fingerprint it in waves, then report duplicates
//! dupewave ingest ~/Archive --db archive.db
//! dupewave hash --db archive.db --workers 8 --batch-size 500
//! dupewave dupes --db archive.db --output csv
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::duplicates::VerifyMode;
use crate::scanner::HashStrategy;

/// Duplicate file detection and wave-scheduled batch fingerprinting.
#[derive(Debug, Parser)]
#[command(name = "dupewave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: platform config dir/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk a directory and report duplicate files
    Scan(ScanArgs),
    /// Walk a directory and store its records in a database
    Ingest(IngestArgs),
    /// Fingerprint stored records lacking a hash, in waves of batches
    Hash(HashArgs),
    /// Report duplicates among stored records
    Dupes(DupesArgs),
}

/// Walk options shared by `scan` and `ingest`.
#[derive(Debug, Args)]
pub struct WalkArgs {
    /// Directory to walk
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (can be specified multiple times)
    ///
    /// These patterns are added to any .gitignore patterns found.
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links during the walk
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,
}

/// Arguments for `scan`.
#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub walk: WalkArgs,

    /// Minimum file size to consider (default from config: 1 byte)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Verification mode
    #[arg(long, value_enum)]
    pub mode: Option<VerifyMode>,

    /// Number of I/O threads for hashing
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Abort on the first unreadable file
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for `ingest`.
#[derive(Debug, Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub walk: WalkArgs,

    /// Database file (created if missing)
    #[arg(long, value_name = "FILE")]
    pub db: PathBuf,
}

/// Arguments for `hash`.
#[derive(Debug, Args)]
pub struct HashArgs {
    /// Database file
    #[arg(long, value_name = "FILE")]
    pub db: PathBuf,

    /// Primary fingerprint strategy
    #[arg(long, value_enum)]
    pub strategy: Option<HashStrategy>,

    /// Batches running at once (one wave)
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub worker_count: Option<usize>,

    /// Records per batch
    #[arg(short = 'b', long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Fail a batch that runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub batch_timeout: Option<u64>,

    /// Minimum record size
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum record size
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Fingerprint at most this many records
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Fingerprint records even when their size is unique
    #[arg(long)]
    pub no_smart: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for `dupes`.
#[derive(Debug, Args)]
pub struct DupesArgs {
    /// Database file
    #[arg(long, value_name = "FILE")]
    pub db: PathBuf,

    /// Minimum record size
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Verification mode
    #[arg(long, value_enum)]
    pub mode: Option<VerifyMode>,

    /// Number of I/O threads for hashing
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
    /// CSV for spreadsheets (duplicate groups only)
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupewave::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
