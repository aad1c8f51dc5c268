//! Duplicate finder implementation with two-phase verification.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Size bucketing**: Group records by exact size (see [`crate::duplicates::groups`])
//! 2. **Quick hash**: Fingerprint the first and last bytes of same-size files
//!    and split each bucket by quick hash (skipped in [`VerifyMode::FullOnly`])
//! 3. **Full hash**: Hash the entire content of every remaining candidate and
//!    emit sub-groups of 2+ as [`DuplicateGroup`]s
//!
//! Quick hashes are a prefilter only. A group is emitted solely on the basis of
//! an exact full-content hash, so no quick-hash collision survives verification.
//!
//! # Example
//!
//! ```no_run
//! use dupewave::duplicates::{DuplicateFinder, FinderConfig, VerifyMode};
//! use std::path::Path;
//!
//! let config = FinderConfig::default()
//!     .with_io_threads(4)
//!     .with_mode(VerifyMode::QuickThenFull);
//! let finder = DuplicateFinder::new(config);
//!
//! let (groups, summary) = finder.find_duplicates(Path::new("/some/path")).unwrap();
//! println!("Found {} duplicate groups", groups.len());
//! println!("Reclaimable space: {}", summary.reclaimable_display());
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use clap::ValueEnum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::groups::{group_by_size, total_wasted_space, DuplicateGroup};
use crate::progress::ProgressCallback;
use crate::scanner::{
    FileRecord, HashError, HashStrategy, Hasher, ScanError, Walker, WalkerConfig,
};

/// Threshold for logging large files.
const LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024; // 100MB

/// How same-size candidates are confirmed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyMode {
    /// Quick-hash every candidate, then full-hash quick-hash collisions.
    #[default]
    QuickThenFull,
    /// Full-hash every candidate directly.
    FullOnly,
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for parallel hashing.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Fail-fast on the first walk or hash error.
    pub strict: bool,
    /// Records smaller than this are never considered.
    pub min_size: u64,
    /// Verification mode.
    pub mode: VerifyMode,
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("strict", &self.strict)
            .field("min_size", &self.min_size)
            .field("mode", &self.mode)
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            strict: false,
            min_size: 1,
            mode: VerifyMode::default(),
            walker_config: WalkerConfig::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the I/O thread count (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set fail-fast on any error.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set the minimum record size.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the verification mode.
    #[must_use]
    pub fn with_mode(mut self, mode: VerifyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Statistics from one hashing phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseStats {
    /// Records that entered the phase
    pub input_files: usize,
    /// Records successfully hashed
    pub hashed_files: usize,
    /// Records dropped because they could not be read
    pub failed_files: usize,
    /// Per-item errors
    pub errors: Vec<HashError>,
    /// Bytes covered by the hashed records
    pub bytes_hashed: u64,
    /// Records eliminated because their hash matched nothing else
    pub eliminated: usize,
    /// Sub-groups of 2+ that survived the phase
    pub surviving_groups: usize,
    /// Records in surviving sub-groups
    pub surviving_files: usize,
    /// Whether the phase stopped early on shutdown
    pub interrupted: bool,
}

/// Run `op` on a dedicated pool of `threads` threads.
///
/// Falls back to the calling context if the pool cannot be built.
fn run_in_pool<R: Send>(threads: usize, op: impl FnOnce() -> R + Send) -> R {
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(op),
        Err(e) => {
            log::warn!(
                "Failed to create I/O thread pool ({}), using global pool with {} threads",
                e,
                rayon::current_num_threads()
            );
            op()
        }
    }
}

/// Outcome of hashing one record.
enum HashOutcome {
    Hashed(FileRecord, String),
    Failed(HashError),
    Skipped,
}

/// Fingerprint records in parallel on the bounded I/O pool.
fn hash_records(
    records: Vec<(usize, FileRecord)>,
    hasher: &Hasher,
    strategy: HashStrategy,
    config: &FinderConfig,
    phase: &str,
) -> Vec<(usize, HashOutcome)> {
    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start(phase, records.len());
    }
    let counter = AtomicUsize::new(0);

    let results = run_in_pool(config.io_threads, || {
        records
            .into_par_iter()
            .map(|(key, file)| {
                if config.is_shutdown_requested() {
                    return (key, HashOutcome::Skipped);
                }

                if file.size > LARGE_FILE_THRESHOLD {
                    log::debug!(
                        "Hashing large file ({} MB): {}",
                        file.size / (1024 * 1024),
                        file.path.display()
                    );
                }

                let outcome = match hasher.fingerprint(&file.path, strategy) {
                    Ok(hash) => {
                        log::trace!("{} hash computed: {}", strategy, file.path.display());
                        HashOutcome::Hashed(file, hash)
                    }
                    Err(e) => {
                        log::warn!("Failed to hash {}: {}", file.path.display(), e);
                        HashOutcome::Failed(e)
                    }
                };

                if let Some(ref callback) = config.progress_callback {
                    let current = counter.fetch_add(1, Ordering::Relaxed) + 1;
                    if let HashOutcome::Hashed(ref file, _) = outcome {
                        callback.on_progress(current, file.path.to_string_lossy().as_ref());
                        callback.on_item_completed(file.size);
                    } else {
                        callback.on_progress(current, "");
                    }
                }

                (key, outcome)
            })
            .collect()
    });

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end(phase);
    }

    results
}

/// Fold hash outcomes into sub-groups keyed by `(group key, hash)`.
fn collect_subgroups(
    outcomes: Vec<(usize, HashOutcome)>,
    stats: &mut PhaseStats,
    attach: impl Fn(&mut FileRecord, &str),
) -> HashMap<(usize, String), Vec<FileRecord>> {
    let mut subgroups: HashMap<(usize, String), Vec<FileRecord>> = HashMap::new();

    for (key, outcome) in outcomes {
        match outcome {
            HashOutcome::Hashed(mut file, hash) => {
                stats.hashed_files += 1;
                stats.bytes_hashed += file.size;
                attach(&mut file, &hash);
                subgroups.entry((key, hash)).or_default().push(file);
            }
            HashOutcome::Failed(e) => {
                stats.failed_files += 1;
                stats.errors.push(e);
            }
            HashOutcome::Skipped => stats.interrupted = true,
        }
    }

    subgroups
}

/// Split size buckets by quick hash.
///
/// Returns candidate sets (each with 2+ records sharing size and quick hash)
/// for the full phase.
#[must_use]
pub fn quick_phase(
    buckets: HashMap<u64, Vec<FileRecord>>,
    hasher: &Hasher,
    config: &FinderConfig,
) -> (Vec<Vec<FileRecord>>, PhaseStats) {
    let input: Vec<(usize, FileRecord)> = buckets
        .into_values()
        .enumerate()
        .flat_map(|(idx, files)| files.into_iter().map(move |f| (idx, f)))
        .collect();
    let mut stats = PhaseStats {
        input_files: input.len(),
        ..Default::default()
    };

    if input.is_empty() {
        log::debug!("Quick phase: No files to process");
        return (Vec::new(), stats);
    }

    log::info!("Quick phase: Computing quick hashes for {} files", input.len());

    let outcomes = hash_records(input, hasher, HashStrategy::Quick, config, "quick");
    let subgroups = collect_subgroups(outcomes, &mut stats, |file, hash| {
        file.quick_hash = Some(hash.to_string());
    });

    let candidates = retain_multiples(subgroups, &mut stats);

    log::info!(
        "Quick phase complete: {} files → {} candidates in {} groups",
        stats.input_files,
        stats.surviving_files,
        stats.surviving_groups
    );

    (candidates, stats)
}

/// Confirm candidate sets with an exact full-content hash.
#[must_use]
pub fn full_phase(
    candidates: Vec<Vec<FileRecord>>,
    hasher: &Hasher,
    config: &FinderConfig,
) -> (Vec<DuplicateGroup>, PhaseStats) {
    let input: Vec<(usize, FileRecord)> = candidates
        .into_iter()
        .enumerate()
        .flat_map(|(idx, files)| files.into_iter().map(move |f| (idx, f)))
        .collect();
    let mut stats = PhaseStats {
        input_files: input.len(),
        ..Default::default()
    };

    if input.is_empty() {
        log::debug!("Full phase: No files to process");
        return (Vec::new(), stats);
    }

    log::info!("Full phase: Computing full hashes for {} files", input.len());

    let outcomes = hash_records(input, hasher, HashStrategy::Full, config, "full");
    let subgroups = collect_subgroups(outcomes, &mut stats, |file, hash| {
        file.content_hash = Some(hash.to_string());
    });

    let groups: Vec<DuplicateGroup> = retain_multiples(subgroups, &mut stats)
        .into_iter()
        .filter_map(|files| {
            let first = files.first()?;
            let hash = first.content_hash.clone()?;
            let size = first.size;
            log::debug!(
                "Duplicate group {}: {} files, {} bytes each",
                hash,
                files.len(),
                size
            );
            Some(DuplicateGroup::new(hash, size, files))
        })
        .collect();

    log::info!(
        "Full phase complete: {} groups, {} bytes reclaimable",
        groups.len(),
        total_wasted_space(&groups)
    );

    (groups, stats)
}

/// Keep sub-groups with 2+ members, counting eliminations.
fn retain_multiples(
    subgroups: HashMap<(usize, String), Vec<FileRecord>>,
    stats: &mut PhaseStats,
) -> Vec<Vec<FileRecord>> {
    subgroups
        .into_values()
        .filter(|files| {
            if files.len() > 1 {
                stats.surviving_groups += 1;
                stats.surviving_files += files.len();
                true
            } else {
                stats.eliminated += files.len();
                false
            }
        })
        .collect()
}

/// Order groups by wasted space (largest first), then by hash.
pub fn sort_groups(groups: &mut [DuplicateGroup]) {
    groups.sort_by(|a, b| {
        b.wasted_space()
            .cmp(&a.wasted_space())
            .then_with(|| a.hash.cmp(&b.hash))
    });
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Total number of records considered
    pub total_files: usize,
    /// Total size of all records in bytes
    pub total_size: u64,
    /// Records eliminated by size bucketing (unique size or below minimum)
    pub eliminated_by_size: usize,
    /// Records eliminated by quick hash
    pub eliminated_by_quick_hash: usize,
    /// Records quick-hashed
    pub quick_hashed: usize,
    /// Records full-hashed
    pub full_hashed: usize,
    /// Bytes read by the full phase
    pub bytes_hashed: u64,
    /// Number of confirmed duplicate groups
    pub duplicate_groups: usize,
    /// Total number of duplicate files (excluding one original per group)
    pub duplicate_files: usize,
    /// Total space that can be reclaimed by removing duplicates
    pub reclaimable_space: u64,
    /// Duration of the entire scan
    pub scan_duration: Duration,
    /// Non-fatal errors encountered during the scan
    pub scan_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Percentage of the scanned bytes wasted by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    /// Whether any item-level errors were recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.scan_errors.is_empty()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A scan error occurred in strict mode.
    #[error(transparent)]
    ScanError(#[from] ScanError),
}

/// Duplicate finder that orchestrates the detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Arc<Hasher>,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self::with_hasher(config, Hasher::new())
    }

    /// Create a finder that fingerprints with a custom hasher.
    #[must_use]
    pub fn with_hasher(config: FinderConfig, hasher: Hasher) -> Self {
        Self {
            config,
            hasher: Arc::new(hasher),
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Walk `path` and find all duplicate files below it.
    ///
    /// # Errors
    ///
    /// Returns `FinderError` if the path does not exist or is not a
    /// directory, if the scan is interrupted, or (in strict mode) on the first
    /// walk or hash error.
    pub fn find_duplicates(
        &self,
        path: &Path,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();

        if !path.exists() {
            return Err(FinderError::PathNotFound(path.to_path_buf()));
        }
        if !path.is_dir() {
            return Err(FinderError::NotADirectory(path.to_path_buf()));
        }

        log::info!("Starting duplicate scan of {}", path.display());

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
            callback.on_message(&format!("Walking {}", path.display()));
        }

        let mut walker = Walker::new(path, self.config.walker_config.clone());
        if let Some(ref flag) = self.config.shutdown_flag {
            walker = walker.with_shutdown_flag(flag.clone());
        }

        let mut files = Vec::new();
        let mut walk_errors = Vec::new();
        for result in walker.walk() {
            match result {
                Ok(file) => {
                    if let Some(ref callback) = self.config.progress_callback {
                        callback.on_progress(files.len() + 1, file.path.to_string_lossy().as_ref());
                    }
                    files.push(file);
                }
                Err(e) if self.config.strict => return Err(FinderError::ScanError(e)),
                Err(e) => walk_errors.push(e),
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (groups, mut summary) = self.verify(files, start_time)?;
        walk_errors.append(&mut summary.scan_errors);
        summary.scan_errors = walk_errors;
        Ok((groups, summary))
    }

    /// Find duplicates from a pre-collected list of records.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::Interrupted` on shutdown, or the first hash error
    /// in strict mode.
    pub fn find_duplicates_from_records(
        &self,
        files: Vec<FileRecord>,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        self.verify(files, Instant::now())
    }

    fn verify(
        &self,
        files: Vec<FileRecord>,
        start_time: Instant,
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let (buckets, size_stats) = group_by_size(files, self.config.min_size);
        let mut summary = ScanSummary {
            total_files: size_stats.total_files,
            total_size: size_stats.total_size,
            eliminated_by_size: size_stats.eliminated_unique + size_stats.below_min_size,
            ..Default::default()
        };

        log::info!(
            "Size bucketing: {} → {} files ({:.1}% eliminated)",
            size_stats.total_files,
            size_stats.potential_duplicates,
            size_stats.elimination_rate()
        );

        if buckets.is_empty() {
            log::info!("No potential duplicates found after size bucketing");
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        let candidates = match self.config.mode {
            VerifyMode::QuickThenFull => {
                let (candidates, quick_stats) =
                    quick_phase(buckets, &self.hasher, &self.config);
                summary.quick_hashed = quick_stats.hashed_files;
                summary.eliminated_by_quick_hash = quick_stats.eliminated;
                self.absorb_errors(&mut summary, quick_stats.errors)?;
                if quick_stats.interrupted || self.config.is_shutdown_requested() {
                    return Err(FinderError::Interrupted);
                }
                candidates
            }
            VerifyMode::FullOnly => buckets.into_values().collect(),
        };

        let (mut groups, full_stats) = full_phase(candidates, &self.hasher, &self.config);
        summary.full_hashed = full_stats.hashed_files;
        summary.bytes_hashed = full_stats.bytes_hashed;
        self.absorb_errors(&mut summary, full_stats.errors)?;
        if full_stats.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        sort_groups(&mut groups);

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        summary.reclaimable_space = total_wasted_space(&groups);
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} duplicate groups, {} duplicate files, {} reclaimable",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display()
        );

        Ok((groups, summary))
    }

    /// Record per-item errors, or fail on the first one in strict mode.
    fn absorb_errors(
        &self,
        summary: &mut ScanSummary,
        errors: Vec<HashError>,
    ) -> Result<(), FinderError> {
        if self.config.strict {
            if let Some(first) = errors.into_iter().next() {
                return Err(FinderError::ScanError(ScanError::HashError(first)));
            }
            return Ok(());
        }
        summary
            .scan_errors
            .extend(errors.into_iter().map(ScanError::from));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> FileRecord {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        FileRecord::new(path, content.len() as u64, SystemTime::now())
    }

    #[test]
    fn test_finder_config_builders() {
        let config = FinderConfig::default()
            .with_io_threads(0)
            .with_strict(true)
            .with_min_size(10)
            .with_mode(VerifyMode::FullOnly);
        assert_eq!(config.io_threads, 1);
        assert!(config.strict);
        assert_eq!(config.min_size, 10);
        assert_eq!(config.mode, VerifyMode::FullOnly);
    }

    #[test]
    fn test_quick_phase_splits_by_quick_hash() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"same-content");
        let b = write(&dir, "b", b"same-content");
        let c = write(&dir, "c", b"diff-content");
        let mut buckets = HashMap::new();
        buckets.insert(12u64, vec![a, b, c]);

        let (candidates, stats) =
            quick_phase(buckets, &Hasher::new(), &FinderConfig::default());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].len(), 2);
        assert!(candidates[0].iter().all(|f| f.quick_hash.is_some()));
        assert_eq!(stats.hashed_files, 3);
        assert_eq!(stats.eliminated, 1);
    }

    #[test]
    fn test_full_phase_rejects_quick_collision() {
        let dir = TempDir::new().unwrap();
        let mut left = vec![0u8; 64 * 1024];
        let mut right = left.clone();
        left[30_000] = 1;
        right[30_000] = 2;
        let a = write(&dir, "a", &left);
        let b = write(&dir, "b", &right);

        let (groups, stats) = full_phase(vec![vec![a, b]], &Hasher::new(), &FinderConfig::default());
        assert!(groups.is_empty());
        assert_eq!(stats.eliminated, 2);
    }

    #[test]
    fn test_missing_file_dropped_from_group() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a", b"xyz");
        let b = write(&dir, "b", b"xyz");
        let ghost = FileRecord::new(dir.path().join("ghost"), 3, SystemTime::now());

        let finder = DuplicateFinder::with_defaults();
        let (groups, summary) = finder
            .find_duplicates_from_records(vec![a, b, ghost])
            .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count(), 2);
        assert_eq!(summary.scan_errors.len(), 1);
    }

    #[test]
    fn test_interrupted_before_start() {
        let flag = Arc::new(AtomicBool::new(true));
        let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(flag));
        let result = finder.find_duplicates_from_records(Vec::new());
        assert!(matches!(result, Err(FinderError::Interrupted)));
    }

    #[test]
    fn test_sort_groups_by_wasted_space() {
        let rec = |p: &str, s: u64| FileRecord::new(PathBuf::from(p), s, SystemTime::UNIX_EPOCH);
        let mut groups = vec![
            DuplicateGroup::new("b".into(), 10, vec![rec("/1", 10), rec("/2", 10)]),
            DuplicateGroup::new("a".into(), 50, vec![rec("/3", 50), rec("/4", 50)]),
            DuplicateGroup::new("a0".into(), 10, vec![rec("/5", 10), rec("/6", 10)]),
        ];
        sort_groups(&mut groups);
        let hashes: Vec<_> = groups.iter().map(|g| g.hash.as_str()).collect();
        assert_eq!(hashes, vec!["a", "a0", "b"]);
    }

    #[test]
    fn test_summary_display() {
        let summary = ScanSummary {
            total_size: 1000,
            reclaimable_space: 250,
            ..Default::default()
        };
        assert_eq!(summary.wasted_percentage(), 25.0);
        assert!(!summary.has_errors());
    }
}
