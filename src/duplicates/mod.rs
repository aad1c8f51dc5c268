//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based candidate bucketing (Phase 1)
//! - Quick hash prefiltering (Phase 2)
//! - Full hash confirmation (Phase 3)
//! - Smart candidate selection for the batch hash pass

pub mod finder;
pub mod groups;
pub mod selection;

pub use finder::{
    full_phase, quick_phase, sort_groups, DuplicateFinder, FinderConfig, FinderError, PhaseStats,
    ScanSummary, VerifyMode,
};
pub use groups::{group_by_size, total_wasted_space, DuplicateGroup, GroupingStats};
pub use selection::{select_against, select_candidates, size_histogram, SelectionStats};
