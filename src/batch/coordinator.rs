//! Wave-based worker pool coordinator.
//!
//! # Overview
//!
//! [`WorkerPool::run`] partitions the items, plans waves and, for each wave,
//! spawns one named OS thread per batch. Workers talk to the coordinator only
//! through a channel of [`WorkerMessage`]s; all aggregation happens on the
//! coordinator thread.
//!
//! A worker that returns an error, panics, disappears or outlives the
//! optional batch timeout fails its own batch and nothing else. The next wave
//! is dispatched only once every batch of the current one is terminal.
//!
//! # Example
//!
//! ```
//! use dupewave::batch::{boxed_worker, BatchJob, BatchWorker, PoolConfig, ProgressSink,
//!     WorkResult, WorkerError, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolConfig::new(4, 10)).unwrap();
//! let factory = |_idx: usize| -> Result<Box<dyn BatchWorker<u32>>, WorkerError> {
//!     Ok(boxed_worker(|job: BatchJob<u32>, sink: &ProgressSink| {
//!         let mut result = WorkResult::default();
//!         for (n, _) in job.items.iter().enumerate() {
//!             result.record_success();
//!             sink.report(n + 1, "item");
//!         }
//!         Ok(result)
//!     }))
//! };
//!
//! let report = pool.run((0..97).collect(), factory);
//! assert_eq!(report.total_batches, 10);
//! assert_eq!(report.waves_run, 3);
//! assert_eq!(report.totals.processed, 97);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use serde::Serialize;

use super::message::{ItemDetail, ProgressSink, WorkResult, WorkerMessage};
use super::scheduler::{partition, plan_waves, BatchJob, BatchState};
use super::worker::WorkerFactory;
use crate::progress::ProgressCallback;
use crate::store::RepositoryError;

/// Skip rate above which a run is flagged, in percent of processed items.
pub const SKIP_RATE_WARNING: f64 = 10.0;

/// Error rate above which a run is flagged, in percent of processed items.
pub const ERROR_RATE_WARNING: f64 = 5.0;

/// Sizing of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum batches running at once (one wave)
    pub worker_count: usize,
    /// Items per batch
    pub batch_size: usize,
    /// Wall-clock limit for one batch, measured from wave dispatch
    pub batch_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            batch_size: 100,
            batch_timeout: None,
        }
    }
}

impl PoolConfig {
    /// Pool with `worker_count` workers and `batch_size` items per batch.
    #[must_use]
    pub fn new(worker_count: usize, batch_size: usize) -> Self {
        Self {
            worker_count,
            batch_size,
            batch_timeout: None,
        }
    }

    /// Fail batches that run longer than `timeout`.
    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }
}

/// Errors that stop a pool run before or outside the waves.
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    /// The pool configuration cannot be used.
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The coordinator could not read its work from the repository.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A batch that never produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// Batch that failed
    pub batch_index: usize,
    /// Items the batch held, all counted as processed
    pub items: usize,
    /// Items the worker never reported progress on, counted as failed
    pub failed_items: usize,
    /// Cause
    pub reason: String,
}

/// Aggregated outcome of a pool run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Items handed to the pool
    pub total_items: usize,
    /// Batches planned
    pub total_batches: usize,
    /// Waves planned
    pub waves_planned: usize,
    /// Waves actually dispatched
    pub waves_run: usize,
    /// Batches that reported a result
    pub batches_completed: usize,
    /// Batches that failed as a whole
    pub batches_failed: usize,
    /// Batches never dispatched (shutdown)
    pub batches_pending: usize,
    /// Merged item tallies
    pub totals: WorkResult,
    /// One entry per failed batch
    pub failed_batches: Vec<BatchFailure>,
    /// Whether a shutdown request stopped the run between waves
    pub interrupted: bool,
    /// Advisory warnings about skip and error rates
    pub warnings: Vec<String>,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl RunReport {
    /// Skipped items as a percentage of processed items.
    #[must_use]
    pub fn skip_rate(&self) -> f64 {
        rate(self.totals.skipped, self.totals.processed)
    }

    /// Failed items as a percentage of processed items.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        rate(self.totals.failed, self.totals.processed)
    }

    /// Whether any item or batch failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0 || self.batches_failed > 0
    }
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

/// Warnings for skip and error rates above their thresholds.
#[must_use]
pub fn advisory_warnings(totals: &WorkResult) -> Vec<String> {
    let mut warnings = Vec::new();
    let skip_rate = rate(totals.skipped, totals.processed);
    let error_rate = rate(totals.failed, totals.processed);

    if skip_rate > SKIP_RATE_WARNING {
        warnings.push(format!(
            "High skip rate: {:.1}% of {} processed items were skipped",
            skip_rate, totals.processed
        ));
    }
    if error_rate > ERROR_RATE_WARNING {
        warnings.push(format!(
            "High error rate: {:.1}% of {} processed items failed",
            error_rate, totals.processed
        ));
    }
    warnings
}

/// Coordinates waves of batch workers.
#[derive(Clone)]
pub struct WorkerPool {
    config: PoolConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

/// Bookkeeping for one batch in flight.
struct InFlight {
    items: usize,
    reported: usize,
}

impl WorkerPool {
    /// Create a pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] for a zero worker count, zero
    /// batch size or zero timeout.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        if config.worker_count == 0 {
            return Err(PoolError::InvalidConfig(
                "worker_count must be at least 1".to_string(),
            ));
        }
        if config.batch_size == 0 {
            return Err(PoolError::InvalidConfig(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if config.batch_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PoolError::InvalidConfig(
                "batch_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            shutdown_flag: None,
            progress_callback: None,
        })
    }

    /// Stop dispatching new waves once `flag` is set.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report progress to `callback` (phase `"batches"`).
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Process `items` in waves of batches, one worker per batch.
    ///
    /// Never fails as a whole: batch failures are folded into the report.
    pub fn run<T, F>(&self, items: Vec<T>, factory: F) -> RunReport
    where
        T: Send + 'static,
        F: WorkerFactory<T>,
    {
        let start = Instant::now();
        let total_items = items.len();
        let batches = partition(items, self.config.batch_size);
        let total_batches = batches.len();
        let mut states = vec![BatchState::Pending; total_batches];
        let waves = plan_waves(batches, self.config.worker_count);
        let factory = Arc::new(factory);

        let mut report = RunReport {
            total_items,
            total_batches,
            waves_planned: waves.len(),
            ..Default::default()
        };

        log::info!(
            "Dispatching {} items in {} batches over {} waves ({} workers, batch size {})",
            total_items,
            total_batches,
            report.waves_planned,
            self.config.worker_count,
            self.config.batch_size
        );

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start("batches", total_items);
        }

        let mut live_progress = 0usize;
        let waves_planned = report.waves_planned;
        for (wave_no, wave) in waves.into_iter().enumerate() {
            if self.is_shutdown_requested() {
                log::warn!(
                    "Shutdown requested, not dispatching waves {}..{}",
                    wave_no + 1,
                    waves_planned
                );
                report.interrupted = true;
                break;
            }

            if let Some(ref callback) = self.progress_callback {
                callback.on_message(&format!("wave {}/{}", wave_no + 1, waves_planned));
            }
            log::debug!(
                "Wave {}/{}: {} batches",
                wave_no + 1,
                waves_planned,
                wave.len()
            );

            self.run_wave(wave, &factory, &mut states, &mut report, &mut live_progress);
            report.waves_run += 1;
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end("batches");
        }

        report.batches_completed = count_state(&states, BatchState::Completed);
        report.batches_failed = count_state(&states, BatchState::Failed);
        report.batches_pending = count_state(&states, BatchState::Pending);
        report.warnings = advisory_warnings(&report.totals);
        for warning in &report.warnings {
            log::warn!("{}", warning);
        }
        report.duration = start.elapsed();

        log::info!(
            "Run finished: {} processed, {} succeeded, {} skipped, {} failed ({} of {} batches failed)",
            report.totals.processed,
            report.totals.succeeded,
            report.totals.skipped,
            report.totals.failed,
            report.batches_failed,
            report.total_batches
        );

        report
    }

    /// Dispatch one wave and block until all of its batches are terminal.
    fn run_wave<T, F>(
        &self,
        wave: Vec<BatchJob<T>>,
        factory: &Arc<F>,
        states: &mut [BatchState],
        report: &mut RunReport,
        live_progress: &mut usize,
    ) where
        T: Send + 'static,
        F: WorkerFactory<T>,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut in_flight: HashMap<usize, InFlight> = HashMap::new();
        let mut handles: Vec<(usize, JoinHandle<()>)> = Vec::new();

        for job in wave {
            let batch_index = job.batch_index;
            let items = job.len();
            transition(states, batch_index, BatchState::Dispatched);

            let worker_tx = tx.clone();
            let worker_factory = Arc::clone(factory);
            let spawned = thread::Builder::new()
                .name(format!("dupewave-worker-{batch_index}"))
                .spawn(move || run_batch(worker_factory.as_ref(), job, worker_tx));

            match spawned {
                Ok(handle) => {
                    in_flight.insert(batch_index, InFlight { items, reported: 0 });
                    handles.push((batch_index, handle));
                }
                Err(e) => {
                    fail_batch(
                        states,
                        report,
                        batch_index,
                        &InFlight { items, reported: 0 },
                        format!("failed to spawn worker thread: {e}"),
                    );
                }
            }
        }
        drop(tx);

        let deadline = self.config.batch_timeout.map(|t| Instant::now() + t);
        let mut abandoned = Vec::new();

        while !in_flight.is_empty() {
            let received = match deadline {
                Some(deadline) => rx.recv_deadline(deadline),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(WorkerMessage::Progress {
                    batch_index,
                    items_processed,
                    current_item,
                }) => {
                    if let Some(batch) = in_flight.get_mut(&batch_index) {
                        if items_processed > batch.reported {
                            *live_progress += items_processed - batch.reported;
                            batch.reported = items_processed;
                            if let Some(ref callback) = self.progress_callback {
                                callback.on_progress(*live_progress, &current_item);
                            }
                        }
                    }
                }
                Ok(WorkerMessage::Complete {
                    batch_index,
                    result,
                }) => match in_flight.remove(&batch_index) {
                    Some(batch) => {
                        *live_progress += result.processed.saturating_sub(batch.reported);
                        transition(states, batch_index, BatchState::Completed);
                        log::debug!(
                            "Batch {} complete: {} processed",
                            batch_index,
                            result.processed
                        );
                        report.totals.merge(result);
                    }
                    None => log::warn!("Ignoring result for unknown batch {}", batch_index),
                },
                Ok(WorkerMessage::Failed {
                    batch_index,
                    reason,
                }) => match in_flight.remove(&batch_index) {
                    Some(batch) => {
                        *live_progress += batch.items.saturating_sub(batch.reported);
                        fail_batch(states, report, batch_index, &batch, reason);
                    }
                    None => log::warn!("Ignoring failure for unknown batch {}", batch_index),
                },
                Err(RecvTimeoutError::Timeout) => {
                    let timeout = self.config.batch_timeout.unwrap_or_default();
                    for (batch_index, batch) in in_flight.drain() {
                        *live_progress += batch.items.saturating_sub(batch.reported);
                        fail_batch(
                            states,
                            report,
                            batch_index,
                            &batch,
                            format!("batch timed out after {timeout:?}"),
                        );
                        abandoned.push(batch_index);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    for (batch_index, batch) in in_flight.drain() {
                        *live_progress += batch.items.saturating_sub(batch.reported);
                        fail_batch(
                            states,
                            report,
                            batch_index,
                            &batch,
                            "worker exited without reporting".to_string(),
                        );
                    }
                }
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(*live_progress, "");
        }

        for (batch_index, handle) in handles {
            if abandoned.contains(&batch_index) {
                log::warn!("Detaching timed-out worker for batch {}", batch_index);
                continue;
            }
            if handle.join().is_err() {
                log::warn!("Worker thread for batch {} panicked after reporting", batch_index);
            }
        }
    }
}

/// Body of one worker thread.
fn run_batch<T, F>(factory: &F, job: BatchJob<T>, tx: Sender<WorkerMessage>)
where
    F: WorkerFactory<T> + ?Sized,
{
    let batch_index = job.batch_index;
    let sink = ProgressSink::new(batch_index, tx.clone());

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut worker = factory.create(batch_index)?;
        worker.process(job, &sink)
    }));

    let message = match outcome {
        Ok(Ok(result)) => WorkerMessage::Complete {
            batch_index,
            result,
        },
        Ok(Err(e)) => WorkerMessage::Failed {
            batch_index,
            reason: e.to_string(),
        },
        Err(payload) => WorkerMessage::Failed {
            batch_index,
            reason: format!("worker panicked: {}", panic_message(payload.as_ref())),
        },
    };

    let _ = tx.send(message);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn transition(states: &mut [BatchState], batch_index: usize, next: BatchState) {
    if let Some(state) = states.get_mut(batch_index) {
        if let Err(e) = state.advance(next) {
            log::error!("Batch {}: {}", batch_index, e);
        }
    }
}

/// Close out a batch that produced no result.
///
/// Every item counts as processed; only the items the worker never reported
/// progress on count as failed.
fn fail_batch(
    states: &mut [BatchState],
    report: &mut RunReport,
    batch_index: usize,
    batch: &InFlight,
    reason: String,
) {
    let items = batch.items;
    let failed_items = items.saturating_sub(batch.reported);
    log::error!(
        "Batch {} failed ({} of {} items unaccounted): {}",
        batch_index,
        failed_items,
        items,
        reason
    );
    transition(states, batch_index, BatchState::Failed);
    report.totals.processed += items;
    report.totals.failed += failed_items;
    report.totals.error_details.push(ItemDetail {
        batch_index,
        item: format!("batch {batch_index}"),
        reason: reason.clone(),
    });
    report.failed_batches.push(BatchFailure {
        batch_index,
        items,
        failed_items,
        reason,
    });
}

fn count_state(states: &[BatchState], wanted: BatchState) -> usize {
    states.iter().filter(|s| **s == wanted).count()
}
