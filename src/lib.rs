//! dupewave - duplicate detection with wave-scheduled batch fingerprinting.
//!
//! Two entry points share one hashing core:
//!
//! - [`duplicates::DuplicateFinder`] walks a tree, buckets files by size,
//!   prefilters with a quick hash and confirms groups with a full BLAKE3
//!   content hash.
//! - [`batch::WorkerPool`] splits stored records into batches and runs them
//!   in waves of worker threads, isolating failures per batch.
//!
//! Records persist in a SQLite [`store::Repository`] between the two.

pub mod app;
pub mod batch;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod store;

pub use app::run_app;
