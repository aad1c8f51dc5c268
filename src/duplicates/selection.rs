//! Smart selection: decide which records are worth fingerprinting at all.
//!
//! A record whose size is unique across the whole corpus cannot have a
//! duplicate, so hashing it is wasted I/O. [`select_candidates`] keeps only
//! records whose size collides with at least one other record and reports
//! how much work was skipped. [`select_against`] applies the same rule to a
//! subset of a larger corpus, such as the unhashed rows of a repository.
//!
//! The collision check must see the full corpus. Running it per batch would
//! miss duplicates whose copies landed in different batches, which is why
//! the selection can be disabled for records ingested incrementally.

use std::collections::HashMap;

use serde::Serialize;

use crate::scanner::FileRecord;

/// Outcome of a selection pass, for operators judging whether it pays off.
///
/// `candidates_kept + candidates_skipped + deferred_by_limit` always equals
/// `total_eligible`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SelectionStats {
    /// Records considered
    pub total_eligible: usize,
    /// Records handed on for fingerprinting
    pub candidates_kept: usize,
    /// Records skipped because their size is unique
    pub candidates_skipped: usize,
    /// Selected records left for a later pass by a record limit
    pub deferred_by_limit: usize,
}

impl SelectionStats {
    /// Share of eligible records skipped, in percent.
    #[must_use]
    pub fn percent_skipped(&self) -> f64 {
        if self.total_eligible == 0 {
            0.0
        } else {
            (self.candidates_skipped as f64 / self.total_eligible as f64) * 100.0
        }
    }
}

/// Count how many records share each size.
#[must_use]
pub fn size_histogram<'a>(records: impl IntoIterator<Item = &'a FileRecord>) -> HashMap<u64, usize> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.size).or_default() += 1;
    }
    counts
}

/// Select the records worth fingerprinting, `records` being the whole corpus.
///
/// With `smart` enabled, only records whose size occurs at least twice in
/// `records` are kept; otherwise every record is kept. Input order is
/// preserved.
#[must_use]
pub fn select_candidates(
    records: Vec<FileRecord>,
    smart: bool,
) -> (Vec<FileRecord>, SelectionStats) {
    let counts = if smart {
        size_histogram(&records)
    } else {
        HashMap::new()
    };
    select_against(records, smart, &counts, None)
}

/// Select from `records` with size collisions checked against `corpus_sizes`.
///
/// `corpus_sizes` counts every record of the corpus by size, including the
/// ones passed in, so a record colliding only with something outside
/// `records` is still kept. At most `limit` selected records are returned,
/// in input order; the rest are reported as deferred.
#[must_use]
pub fn select_against(
    records: Vec<FileRecord>,
    smart: bool,
    corpus_sizes: &HashMap<u64, usize>,
    limit: Option<usize>,
) -> (Vec<FileRecord>, SelectionStats) {
    let total_eligible = records.len();

    let mut kept: Vec<FileRecord> = if smart {
        records
            .into_iter()
            .filter(|r| corpus_sizes.get(&r.size).copied().unwrap_or(0) > 1)
            .collect()
    } else {
        log::debug!(
            "Smart selection disabled: fingerprinting all {} records",
            total_eligible
        );
        records
    };

    let selected = kept.len();
    if let Some(limit) = limit {
        kept.truncate(limit);
    }

    let stats = SelectionStats {
        total_eligible,
        candidates_kept: kept.len(),
        candidates_skipped: total_eligible - selected,
        deferred_by_limit: selected - kept.len(),
    };

    if smart {
        log::info!(
            "Smart selection: {} of {} records kept ({:.1}% skipped)",
            selected,
            stats.total_eligible,
            stats.percent_skipped()
        );
    }

    (kept, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn records(sizes: &[u64]) -> Vec<FileRecord> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &s)| FileRecord::new(PathBuf::from(format!("/f{i}")), s, SystemTime::UNIX_EPOCH))
            .collect()
    }

    #[test]
    fn test_smart_keeps_only_colliding_sizes() {
        let (kept, stats) = select_candidates(records(&[100, 100, 100, 200, 300]), true);

        assert_eq!(kept.len(), 3);
        assert!(kept.iter().all(|r| r.size == 100));
        assert_eq!(stats.total_eligible, 5);
        assert_eq!(stats.candidates_kept, 3);
        assert_eq!(stats.candidates_skipped, 2);
        assert!((stats.percent_skipped() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_disabled_keeps_everything() {
        let (kept, stats) = select_candidates(records(&[1, 2, 3]), false);
        assert_eq!(kept.len(), 3);
        assert_eq!(stats.candidates_skipped, 0);
        assert_eq!(stats.percent_skipped(), 0.0);
    }

    #[test]
    fn test_preserves_input_order() {
        let (kept, _) = select_candidates(records(&[5, 7, 5, 7, 9]), true);
        let paths: Vec<_> = kept.iter().map(|r| r.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/f0"),
                PathBuf::from("/f1"),
                PathBuf::from("/f2"),
                PathBuf::from("/f3")
            ]
        );
    }

    #[test]
    fn test_collision_outside_the_subset_is_kept() {
        let corpus = size_histogram(&records(&[10, 10, 20, 30, 30]));
        let pending = records(&[10, 20, 30]);

        let (kept, stats) = select_against(pending, true, &corpus, None);

        let sizes: Vec<u64> = kept.iter().map(|r| r.size).collect();
        assert_eq!(sizes, vec![10, 30]);
        assert_eq!(stats.candidates_skipped, 1);
    }

    #[test]
    fn test_limit_defers_selected_records() {
        let corpus = size_histogram(&records(&[4, 4, 4, 4, 9]));
        let (kept, stats) = select_against(records(&[4, 4, 4, 4, 9]), true, &corpus, Some(3));

        assert_eq!(kept.len(), 3);
        assert_eq!(stats.total_eligible, 5);
        assert_eq!(stats.candidates_kept, 3);
        assert_eq!(stats.candidates_skipped, 1);
        assert_eq!(stats.deferred_by_limit, 1);

        let (all, stats) = select_against(records(&[1, 2, 3]), false, &HashMap::new(), Some(2));
        assert_eq!(all.len(), 2);
        assert_eq!(stats.candidates_skipped, 0);
        assert_eq!(stats.deferred_by_limit, 1);
    }

    #[test]
    fn test_empty_corpus() {
        let (kept, stats) = select_candidates(Vec::new(), true);
        assert!(kept.is_empty());
        assert_eq!(stats, SelectionStats::default());
    }
}
