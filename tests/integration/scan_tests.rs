use dupewave::duplicates::{DuplicateFinder, FinderConfig, FinderError, VerifyMode};
use dupewave::scanner::{FileRecord, WalkerConfig};
use std::fs::{self, File};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

fn write_file(path: &std::path::Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let finder = DuplicateFinder::with_defaults();

    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
    assert_eq!(summary.reclaimable_space, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), b"content a");
    write_file(&dir.path().join("b.txt"), b"content bb");
    write_file(&dir.path().join("c.txt"), b"content ccc");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.eliminated_by_size, 3);
    assert_eq!(summary.full_hashed, 0);
}

#[test]
fn test_scan_duplicate_files() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a.txt"), b"duplicate");
    write_file(&dir.path().join("b.txt"), b"duplicate");
    write_file(&dir.path().join("c.txt"), b"unique");

    let finder = DuplicateFinder::with_defaults();
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].files.len(), 2);
    assert_eq!(groups[0].wasted_space(), 9);
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(summary.reclaimable_space, 9);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("nested").join("deeper");
    fs::create_dir_all(&sub).unwrap();
    write_file(&dir.path().join("top.bin"), b"same bytes");
    write_file(&sub.join("bottom.bin"), b"same bytes");

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    let paths = groups[0].paths();
    assert!(paths.iter().any(|p| p.ends_with("top.bin")));
    assert!(paths.iter().any(|p| p.ends_with("bottom.bin")));
}

#[test]
fn test_equal_size_distinct_content_yields_no_groups() {
    let dir = tempdir().unwrap();
    for i in 0..5u8 {
        write_file(&dir.path().join(format!("f{i}.bin")), &[i; 64]);
    }

    for mode in [VerifyMode::QuickThenFull, VerifyMode::FullOnly] {
        let finder = DuplicateFinder::new(FinderConfig::default().with_mode(mode));
        let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();
        assert!(groups.is_empty(), "mode {mode:?}");
        assert_eq!(summary.eliminated_by_size, 0);
    }
}

#[test]
fn test_shared_edges_different_middle_are_not_duplicates() {
    let dir = tempdir().unwrap();
    let mut a = vec![7u8; 64 * 1024];
    let mut b = a.clone();
    a[32 * 1024] = 1;
    b[32 * 1024] = 2;
    write_file(&dir.path().join("a.bin"), &a);
    write_file(&dir.path().join("b.bin"), &b);

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.quick_hashed, 2);
    assert_eq!(summary.full_hashed, 2);
}

#[test]
fn test_mixed_sizes_scenario() {
    let dir = tempdir().unwrap();
    let hundred = vec![b'x'; 100];
    write_file(&dir.path().join("a"), &hundred);
    write_file(&dir.path().join("b"), &hundred);
    write_file(&dir.path().join("c"), &hundred);
    write_file(&dir.path().join("d"), &vec![b'y'; 200]);
    write_file(&dir.path().join("e"), &vec![b'z'; 300]);

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].count(), 3);
    assert_eq!(groups[0].size, 100);
    assert_eq!(summary.reclaimable_space, 200);
    assert_eq!(summary.eliminated_by_size, 2);
}

#[test]
fn test_groups_sorted_by_wasted_space() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("s1"), &[1u8; 10]);
    write_file(&dir.path().join("s2"), &[1u8; 10]);
    write_file(&dir.path().join("l1"), &[2u8; 1000]);
    write_file(&dir.path().join("l2"), &[2u8; 1000]);

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].size, 1000);
    assert_eq!(groups[1].size, 10);
}

#[test]
fn test_min_size_excludes_small_and_empty_files() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("e1"), b"");
    write_file(&dir.path().join("e2"), b"");
    write_file(&dir.path().join("t1"), b"tiny");
    write_file(&dir.path().join("t2"), b"tiny");

    let (groups, _) = DuplicateFinder::with_defaults()
        .find_duplicates(dir.path())
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].size, 4);

    let finder = DuplicateFinder::new(FinderConfig::default().with_min_size(5));
    let (groups, _) = finder.find_duplicates(dir.path()).unwrap();
    assert!(groups.is_empty());
}

#[test]
fn test_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    for i in 0..4 {
        write_file(&dir.path().join(format!("dup{i}")), b"repeated payload");
    }
    write_file(&dir.path().join("other1"), b"another payload!");
    write_file(&dir.path().join("other2"), b"another payload!");

    let finder = DuplicateFinder::with_defaults();
    let (first, _) = finder.find_duplicates(dir.path()).unwrap();
    let (second, _) = finder.find_duplicates(dir.path()).unwrap();

    let shape = |groups: &[dupewave::duplicates::DuplicateGroup]| {
        groups
            .iter()
            .map(|g| (g.hash.clone(), g.paths()))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&first), shape(&second));
}

#[test]
fn test_ignore_patterns_and_hidden_files() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("keep1.txt"), b"same");
    write_file(&dir.path().join("keep2.txt"), b"same");
    write_file(&dir.path().join("skip.tmp"), b"same");
    write_file(&dir.path().join(".hidden"), b"same");

    let walker = WalkerConfig::new(false, true, None, None, vec!["*.tmp".to_string()]);
    let finder = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker));
    let (groups, summary) = finder.find_duplicates(dir.path()).unwrap();

    assert_eq!(summary.total_files, 2);
    assert_eq!(groups[0].count(), 2);
}

#[test]
fn test_missing_and_non_directory_paths() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    write_file(&file, b"x");

    let finder = DuplicateFinder::with_defaults();
    assert!(matches!(
        finder.find_duplicates(&dir.path().join("absent")),
        Err(FinderError::PathNotFound(_))
    ));
    assert!(matches!(
        finder.find_duplicates(&file),
        Err(FinderError::NotADirectory(_))
    ));
}

#[test]
fn test_shutdown_before_scan_is_interrupted() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a"), b"data");

    let flag = Arc::new(AtomicBool::new(true));
    let finder = DuplicateFinder::new(FinderConfig::default().with_shutdown_flag(flag));
    assert!(matches!(
        finder.find_duplicates(dir.path()),
        Err(FinderError::Interrupted)
    ));
}

#[test]
fn test_vanished_record_is_dropped_not_fatal() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    write_file(&a, b"twin");
    write_file(&b, b"twin");
    let ghost = FileRecord::new(dir.path().join("ghost"), 4, std::time::SystemTime::UNIX_EPOCH);

    let records = vec![
        FileRecord::from_metadata(a.clone(), &fs::metadata(&a).unwrap()),
        FileRecord::from_metadata(b.clone(), &fs::metadata(&b).unwrap()),
        ghost,
    ];

    let (groups, summary) = DuplicateFinder::with_defaults()
        .find_duplicates_from_records(records.clone())
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].count(), 2);
    assert_eq!(summary.scan_errors.len(), 1);

    let strict = DuplicateFinder::new(FinderConfig::default().with_strict(true));
    assert!(strict.find_duplicates_from_records(records).is_err());
}
