//! Worker traits and the fingerprinting worker.
//!
//! A [`WorkerFactory`] builds one [`BatchWorker`] per batch, on the worker
//! thread that will run it. Anything a worker needs exclusively (such as a
//! repository connection) is created there and never crosses threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::coordinator::{PoolError, RunReport, WorkerPool};
use super::message::{ProgressSink, WorkResult};
use super::scheduler::BatchJob;
use crate::duplicates::SelectionStats;
use crate::scanner::{FileRecord, HashError, HashStrategy, Hasher};
use crate::store::{PendingHash, Repository, RepositoryError};

/// Failure that aborts a whole batch.
#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    /// The worker could not reach its repository.
    #[error("repository unavailable: {0}")]
    Repository(#[from] RepositoryError),

    /// Any other batch-level failure.
    #[error("{0}")]
    Other(String),
}

/// Processes one batch at a time on a dedicated thread.
pub trait BatchWorker<T>: Send {
    /// Handle every item of `job`, reporting cumulative progress on `progress`.
    ///
    /// Item-level problems belong in the returned [`WorkResult`]; an `Err`
    /// fails the entire batch.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] when the batch cannot be processed at all.
    fn process(&mut self, job: BatchJob<T>, progress: &ProgressSink)
        -> Result<WorkResult, WorkerError>;
}

impl<T, F> BatchWorker<T> for F
where
    F: FnMut(BatchJob<T>, &ProgressSink) -> Result<WorkResult, WorkerError> + Send,
{
    fn process(
        &mut self,
        job: BatchJob<T>,
        progress: &ProgressSink,
    ) -> Result<WorkResult, WorkerError> {
        self(job, progress)
    }
}

/// Box a closure as a [`BatchWorker`].
pub fn boxed_worker<T, F>(f: F) -> Box<dyn BatchWorker<T>>
where
    T: 'static,
    F: FnMut(BatchJob<T>, &ProgressSink) -> Result<WorkResult, WorkerError> + Send + 'static,
{
    Box::new(f)
}

/// Builds a fresh worker for each batch.
pub trait WorkerFactory<T>: Send + Sync + 'static {
    /// Create the worker for `batch_index`. Runs on the worker thread.
    ///
    /// # Errors
    ///
    /// A failure here fails the batch.
    fn create(&self, batch_index: usize) -> Result<Box<dyn BatchWorker<T>>, WorkerError>;
}

impl<T, F> WorkerFactory<T> for F
where
    F: Fn(usize) -> Result<Box<dyn BatchWorker<T>>, WorkerError> + Send + Sync + 'static,
{
    fn create(&self, batch_index: usize) -> Result<Box<dyn BatchWorker<T>>, WorkerError> {
        self(batch_index)
    }
}

/// Fingerprints records and stores the result through its own repository.
pub struct HashWorker {
    repo: Repository,
    hasher: Arc<Hasher>,
    strategy: HashStrategy,
}

impl HashWorker {
    /// Create a worker writing through `repo`.
    #[must_use]
    pub fn new(repo: Repository, hasher: Arc<Hasher>, strategy: HashStrategy) -> Self {
        Self {
            repo,
            hasher,
            strategy,
        }
    }

    /// Quick hash plus the primary fingerprint of one file, with the
    /// concrete strategy the primary one was computed under.
    fn fingerprint(&self, record: &FileRecord) -> Result<Fingerprints, HashError> {
        let resolved = self.hasher.resolve(self.strategy, record.size);
        let quick = self.hasher.fingerprint(&record.path, HashStrategy::Quick)?;
        let primary = if resolved == HashStrategy::Quick {
            quick.clone()
        } else {
            self.hasher.fingerprint(&record.path, resolved)?
        };
        Ok(Fingerprints {
            resolved,
            primary,
            quick,
        })
    }

    /// Only exact fingerprints go into the content hash column.
    fn store(&self, id: i64, prints: &Fingerprints) -> Result<(), RepositoryError> {
        if prints.resolved.is_exact() {
            self.repo.update_hash(id, &prints.primary, Some(&prints.quick))
        } else {
            self.repo
                .update_partial_hash(id, prints.resolved, &prints.primary, Some(&prints.quick))
        }
    }
}

struct Fingerprints {
    resolved: HashStrategy,
    primary: String,
    quick: String,
}

impl BatchWorker<FileRecord> for HashWorker {
    fn process(
        &mut self,
        job: BatchJob<FileRecord>,
        progress: &ProgressSink,
    ) -> Result<WorkResult, WorkerError> {
        let batch_index = job.batch_index;
        let mut result = WorkResult::default();

        for (done, record) in job.items.into_iter().enumerate() {
            let label = record.label();

            match record.id {
                None => {
                    log::warn!("Skipping {}: record has no repository id", label);
                    result.record_skip(batch_index, &label, "record has no repository id");
                }
                Some(id) => match self.fingerprint(&record) {
                    Ok(prints) => match self.store(id, &prints) {
                        Ok(()) => result.record_success(),
                        Err(e) => {
                            log::warn!("Failed to store hash for {}: {}", label, e);
                            result.record_failure(batch_index, &label, e.to_string());
                        }
                    },
                    Err(e) => {
                        log::warn!("Skipping {}: {}", label, e);
                        result.record_skip(batch_index, &label, e.to_string());
                    }
                },
            }

            progress.report(done + 1, &label);
        }

        log::debug!(
            "Batch {} done: {} hashed, {} skipped, {} failed",
            batch_index,
            result.succeeded,
            result.skipped,
            result.failed
        );
        Ok(result)
    }
}

/// Opens a repository connection per batch and hands it to a [`HashWorker`].
#[derive(Debug, Clone)]
pub struct HashWorkerFactory {
    db_path: PathBuf,
    hasher: Arc<Hasher>,
    strategy: HashStrategy,
}

impl HashWorkerFactory {
    /// Create a factory for workers writing to the database at `db_path`.
    #[must_use]
    pub fn new(db_path: &Path, hasher: Hasher, strategy: HashStrategy) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            hasher: Arc::new(hasher),
            strategy,
        }
    }
}

impl WorkerFactory<FileRecord> for HashWorkerFactory {
    fn create(&self, batch_index: usize) -> Result<Box<dyn BatchWorker<FileRecord>>, WorkerError> {
        log::trace!("Opening repository for batch {}", batch_index);
        let repo = Repository::open(&self.db_path)?;
        Ok(Box::new(HashWorker::new(
            repo,
            Arc::clone(&self.hasher),
            self.strategy,
        )))
    }
}

/// Which stored records a hash pass should fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPassOptions {
    /// Smallest record size considered
    pub min_size: u64,
    /// Largest record size considered
    pub max_size: Option<u64>,
    /// Cap on the number of records dispatched, applied after selection
    pub limit: Option<usize>,
    /// Skip records whose size is unique in the store
    pub smart: bool,
    /// Primary fingerprint strategy
    pub strategy: HashStrategy,
}

impl Default for HashPassOptions {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: None,
            limit: None,
            smart: true,
            strategy: HashStrategy::default(),
        }
    }
}

/// Result of a hash pass.
#[derive(Debug, Clone, Serialize)]
pub struct HashPassReport {
    /// Smart selection outcome, computed before dispatch
    pub selection: SelectionStats,
    /// Coordinator report
    pub run: RunReport,
}

/// Fingerprint the stored records the pass's strategy has not covered yet.
///
/// Exact strategies pick up every record without a content hash, including
/// ones that only carry a partial fingerprint. Other strategies skip any
/// record already fingerprinted.
///
/// # Errors
///
/// Repository failures on the coordinator side are fatal. Failures inside a
/// worker only fail that worker's batch.
pub fn run_hash_pass(
    pool: &WorkerPool,
    db_path: &Path,
    hasher: Hasher,
    options: &HashPassOptions,
) -> Result<HashPassReport, PoolError> {
    let repo = Repository::open(db_path)?;
    let (records, selection) = repo.select_pending(
        PendingHash::for_strategy(options.strategy),
        options.min_size,
        options.max_size,
        options.limit,
        options.smart,
    )?;
    drop(repo);

    log::info!(
        "Hash pass: {} eligible records, {} selected ({:.1}% skipped, {} deferred by limit)",
        selection.total_eligible,
        selection.candidates_kept,
        selection.percent_skipped(),
        selection.deferred_by_limit
    );

    let factory = HashWorkerFactory::new(db_path, hasher, options.strategy);
    let run = pool.run(records, factory);

    Ok(HashPassReport { selection, run })
}
