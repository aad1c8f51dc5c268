//! Batch partitioning and wave planning.
//!
//! Items are cut into fixed-size batches in input order, then batches are
//! grouped into waves of at most `worker_count`. A wave is the unit of
//! concurrency: every batch of a wave runs on its own thread and the next
//! wave starts only once all of them are terminal.

use std::fmt;

/// A slice of work handed to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob<T> {
    /// Position of this batch in the partition (0-based)
    pub batch_index: usize,
    /// Items of this batch, in input order
    pub items: Vec<T>,
}

impl<T> BatchJob<T> {
    /// Create a batch.
    #[must_use]
    pub fn new(batch_index: usize, items: Vec<T>) -> Self {
        Self { batch_index, items }
    }

    /// Number of items in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Number of batches for `item_count` items: `⌈N / B⌉`.
#[must_use]
pub fn batch_count(item_count: usize, batch_size: usize) -> usize {
    item_count.div_ceil(batch_size.max(1))
}

/// Number of waves for `batches` batches: `⌈batches / W⌉`.
#[must_use]
pub fn wave_count(batches: usize, worker_count: usize) -> usize {
    batches.div_ceil(worker_count.max(1))
}

/// Split `items` into ordered batches of `batch_size` (the last may be short).
///
/// Every item lands in exactly one batch. A `batch_size` of zero is treated
/// as one.
#[must_use]
pub fn partition<T>(items: Vec<T>, batch_size: usize) -> Vec<BatchJob<T>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(batch_count(items.len(), batch_size));
    let mut iter = items.into_iter().peekable();

    while iter.peek().is_some() {
        let chunk: Vec<T> = iter.by_ref().take(batch_size).collect();
        batches.push(BatchJob::new(batches.len(), chunk));
    }

    batches
}

/// Group batches into waves of at most `worker_count`, preserving order.
#[must_use]
pub fn plan_waves<T>(batches: Vec<BatchJob<T>>, worker_count: usize) -> Vec<Vec<BatchJob<T>>> {
    let worker_count = worker_count.max(1);
    let mut waves = Vec::with_capacity(wave_count(batches.len(), worker_count));
    let mut iter = batches.into_iter().peekable();

    while iter.peek().is_some() {
        waves.push(iter.by_ref().take(worker_count).collect());
    }

    waves
}

/// Lifecycle of one batch as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchState {
    /// Not yet handed to a worker
    Pending,
    /// Running on a worker thread
    Dispatched,
    /// Worker reported a result
    Completed,
    /// Worker errored, panicked, timed out or vanished
    Failed,
}

impl BatchState {
    /// Whether the batch has reached a final state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Move to `next`, rejecting any transition outside
    /// `Pending → Dispatched → Completed | Failed`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] and leaves the state unchanged.
    pub fn advance(&mut self, next: Self) -> Result<(), InvalidTransition> {
        let allowed = matches!(
            (*self, next),
            (Self::Pending, Self::Dispatched)
                | (Self::Dispatched, Self::Completed)
                | (Self::Dispatched, Self::Failed)
        );
        if allowed {
            *self = next;
            Ok(())
        } else {
            Err(InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Rejected batch state transition.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid batch transition {from} -> {to}")]
pub struct InvalidTransition {
    /// State before the attempted move
    pub from: BatchState,
    /// Requested state
    pub to: BatchState,
}
