//! Duplicate grouping and size-based candidate buckets.
//!
//! # Overview
//!
//! Size bucketing is the first phase of duplicate detection. Files with
//! different sizes cannot be duplicates, so records are grouped by exact size
//! and singleton buckets are discarded before any file is opened.
//!
//! # Example
//!
//! ```
//! use dupewave::scanner::FileRecord;
//! use dupewave::duplicates::group_by_size;
//! use std::path::PathBuf;
//! use std::time::SystemTime;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, SystemTime::now()),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, SystemTime::now()),
//! ];
//!
//! let (buckets, stats) = group_by_size(files, 0);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(buckets.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::scanner::FileRecord;

/// Confirmed duplicate group of files.
///
/// Every member shares the same size and the same exact content hash, and a
/// group always has at least two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Exact content hash (lowercase hex)
    pub hash: String,
    /// File size in bytes, shared by all members
    pub size: u64,
    /// Members, ordered by path
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new duplicate group. Members are sorted by path.
    #[must_use]
    pub fn new(hash: String, size: u64, mut files: Vec<FileRecord>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { hash, size, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn count(&self) -> usize {
        self.files.len()
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }

    /// Bytes occupied by redundant copies: `(count - 1) * size`.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }
}

/// Sum of wasted space over all groups.
#[must_use]
pub fn total_wasted_space(groups: &[DuplicateGroup]) -> u64 {
    groups.iter().map(DuplicateGroup::wasted_space).sum()
}

/// Statistics from size grouping phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of files dropped by the minimum size filter
    pub below_min_size: usize,
    /// Number of distinct file sizes (after the minimum size filter)
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in buckets of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton buckets)
    pub eliminated_unique: usize,
    /// Number of buckets with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            let eliminated = self.eliminated_unique + self.below_min_size;
            (eliminated as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by size (Phase 1 of duplicate detection).
///
/// Records smaller than `min_size` are dropped, the rest are bucketed by exact
/// size, and buckets holding a single record are discarded.
///
/// # Returns
///
/// A tuple of:
/// - `HashMap<u64, Vec<FileRecord>>` - Buckets with 2+ records
/// - `GroupingStats` - Statistics about the grouping operation
///
/// # Performance
///
/// O(n) time and space. No file I/O is performed.
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
    min_size: u64,
) -> (HashMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut all_groups: HashMap<u64, Vec<FileRecord>> = HashMap::new();
    let mut stats = GroupingStats::default();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size;

        if file.size < min_size {
            stats.below_min_size += 1;
            log::trace!(
                "Below minimum size ({} < {}): {}",
                file.size,
                min_size,
                file.path.display()
            );
            continue;
        }

        all_groups.entry(file.size).or_default().push(file);
    }

    stats.unique_sizes = all_groups.len();

    let filtered_groups: HashMap<u64, Vec<FileRecord>> = all_groups
        .into_iter()
        .filter(|(size, files)| {
            if files.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: {}",
                    size,
                    files[0].path.display()
                );
                false
            } else {
                stats.potential_duplicates += files.len();
                stats.duplicate_groups += 1;
                log::debug!(
                    "Size bucket {} bytes: {} potential duplicates",
                    size,
                    files.len()
                );
                true
            }
        })
        .collect();

    (filtered_groups, stats)
}
