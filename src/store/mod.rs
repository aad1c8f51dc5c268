//! Record repository for the batch hash pass.
//!
//! Records discovered by the walker are stored here by `ingest`; the batch
//! coordinator later pulls the ones still lacking a fingerprint and every
//! worker writes its results back through its own connection.
//!
//! # Invalidation
//!
//! Records are keyed by path. Re-ingesting a path whose size or
//! modification time changed clears its stored fingerprints.

pub mod database;

pub use database::{PendingHash, Repository, RepositoryError, RepositoryResult};
