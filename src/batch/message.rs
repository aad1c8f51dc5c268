//! Messages exchanged between worker threads and the coordinator.

use crossbeam_channel::Sender;
use serde::Serialize;

/// Outcome of one item, kept for the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDetail {
    /// Batch the item belonged to
    pub batch_index: usize,
    /// Item label (usually a path)
    pub item: String,
    /// What happened
    pub reason: String,
}

/// Tallies produced by one worker for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkResult {
    /// Items the worker looked at
    pub processed: usize,
    /// Items fully handled
    pub succeeded: usize,
    /// Items deliberately passed over (missing, unreadable, no id)
    pub skipped: usize,
    /// Items whose handling failed
    pub failed: usize,
    /// One line per skipped item
    pub skip_details: Vec<ItemDetail>,
    /// One line per failed item
    pub error_details: Vec<ItemDetail>,
}

impl WorkResult {
    /// Count one successful item.
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    /// Count one skipped item with its reason.
    pub fn record_skip(&mut self, batch_index: usize, item: impl Into<String>, reason: impl Into<String>) {
        self.processed += 1;
        self.skipped += 1;
        self.skip_details.push(ItemDetail {
            batch_index,
            item: item.into(),
            reason: reason.into(),
        });
    }

    /// Count one failed item with its reason.
    pub fn record_failure(&mut self, batch_index: usize, item: impl Into<String>, reason: impl Into<String>) {
        self.processed += 1;
        self.failed += 1;
        self.error_details.push(ItemDetail {
            batch_index,
            item: item.into(),
            reason: reason.into(),
        });
    }

    /// Fold another batch's tallies into this one.
    pub fn merge(&mut self, other: WorkResult) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.skip_details.extend(other.skip_details);
        self.error_details.extend(other.error_details);
    }
}

/// Message from a worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Items processed so far in this batch (cumulative).
    Progress {
        /// Batch reporting
        batch_index: usize,
        /// Items processed so far in this batch
        items_processed: usize,
        /// Item just finished
        current_item: String,
    },
    /// Batch finished; sent exactly once.
    Complete {
        /// Batch reporting
        batch_index: usize,
        /// Tallies for the whole batch
        result: WorkResult,
    },
    /// Batch aborted by a worker error or panic.
    Failed {
        /// Batch reporting
        batch_index: usize,
        /// Human-readable cause
        reason: String,
    },
}

impl WorkerMessage {
    /// Batch the message is about.
    #[must_use]
    pub fn batch_index(&self) -> usize {
        match self {
            Self::Progress { batch_index, .. }
            | Self::Complete { batch_index, .. }
            | Self::Failed { batch_index, .. } => *batch_index,
        }
    }
}

/// Handle a worker uses to report progress for its batch.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    batch_index: usize,
    tx: Sender<WorkerMessage>,
}

impl ProgressSink {
    /// Create a sink for `batch_index` sending on `tx`.
    #[must_use]
    pub fn new(batch_index: usize, tx: Sender<WorkerMessage>) -> Self {
        Self { batch_index, tx }
    }

    /// Batch this sink reports for.
    #[must_use]
    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    /// Report cumulative progress. Dropped silently if the coordinator is gone.
    pub fn report(&self, items_processed: usize, current_item: &str) {
        let _ = self.tx.send(WorkerMessage::Progress {
            batch_index: self.batch_index,
            items_processed,
            current_item: current_item.to_string(),
        });
    }
}
