//! Batch scheduling and the wave-based worker pool.
//!
//! This module provides functionality for:
//! - Partitioning items into ordered batches and waves ([`scheduler`])
//! - Worker/coordinator messages and per-batch tallies ([`message`])
//! - Worker traits and the fingerprinting worker ([`worker`])
//! - The coordinator that runs waves and aggregates results ([`coordinator`])

pub mod coordinator;
pub mod message;
pub mod scheduler;
pub mod worker;

pub use coordinator::{
    advisory_warnings, BatchFailure, PoolConfig, PoolError, RunReport, WorkerPool,
    ERROR_RATE_WARNING, SKIP_RATE_WARNING,
};
pub use message::{ItemDetail, ProgressSink, WorkResult, WorkerMessage};
pub use scheduler::{
    batch_count, partition, plan_waves, wave_count, BatchJob, BatchState, InvalidTransition,
};
pub use worker::{
    boxed_worker, run_hash_pass, BatchWorker, HashPassOptions, HashPassReport, HashWorker,
    HashWorkerFactory, WorkerError, WorkerFactory,
};
