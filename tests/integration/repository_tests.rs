use dupewave::batch::{run_hash_pass, HashPassOptions, PoolConfig, WorkerPool};
use dupewave::duplicates::{DuplicateFinder, SelectionStats};
use dupewave::scanner::{HashStrategy, Hasher, Walker, WalkerConfig};
use dupewave::store::Repository;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn ingest(root: &Path, db: &Path) -> usize {
    let records: Vec<_> = Walker::new(root, WalkerConfig::default())
        .walk()
        .filter_map(Result::ok)
        .collect();
    let mut repo = Repository::open(db).unwrap();
    repo.insert_records(&records).unwrap()
}

fn populate(root: &Path) {
    fs::write(root.join("a1"), vec![b'a'; 100]).unwrap();
    fs::write(root.join("a2"), vec![b'a'; 100]).unwrap();
    fs::write(root.join("a3"), vec![b'b'; 100]).unwrap();
    fs::write(root.join("lonely"), vec![b'c'; 200]).unwrap();
    fs::write(root.join("single"), vec![b'd'; 300]).unwrap();
}

#[test]
fn test_hash_pass_fingerprints_only_colliding_sizes() {
    let data = tempdir().unwrap();
    let store = tempdir().unwrap();
    let db = store.path().join("records.db");
    populate(data.path());
    assert_eq!(ingest(data.path(), &db), 5);

    let pool = WorkerPool::new(PoolConfig::new(2, 2)).unwrap();
    let report = run_hash_pass(&pool, &db, Hasher::new(), &HashPassOptions::default()).unwrap();

    assert_eq!(
        report.selection,
        SelectionStats {
            total_eligible: 5,
            candidates_kept: 3,
            candidates_skipped: 2,
            deferred_by_limit: 0,
        }
    );
    assert_eq!(report.run.total_items, 3);
    assert_eq!(report.run.total_batches, 2);
    assert_eq!(report.run.totals.succeeded, 3);

    let repo = Repository::open(&db).unwrap();
    assert_eq!(repo.count_hashed().unwrap(), 3);
    let a1 = repo.find_by_path(&data.path().join("a1")).unwrap().unwrap();
    let a2 = repo.find_by_path(&data.path().join("a2")).unwrap().unwrap();
    let a3 = repo.find_by_path(&data.path().join("a3")).unwrap().unwrap();
    assert_eq!(a1.content_hash, a2.content_hash);
    assert_ne!(a1.content_hash, a3.content_hash);
    assert!(repo
        .find_by_path(&data.path().join("lonely"))
        .unwrap()
        .unwrap()
        .content_hash
        .is_none());
}

#[test]
fn test_second_hash_pass_has_nothing_to_do() {
    let data = tempdir().unwrap();
    let db = data.path().join("records.db");
    let files = data.path().join("files");
    fs::create_dir(&files).unwrap();
    populate(&files);
    ingest(&files, &db);

    let pool = WorkerPool::new(PoolConfig::default()).unwrap();
    run_hash_pass(&pool, &db, Hasher::new(), &HashPassOptions::default()).unwrap();
    let again = run_hash_pass(&pool, &db, Hasher::new(), &HashPassOptions::default()).unwrap();

    assert_eq!(again.run.total_items, 0);
    assert_eq!(again.run.total_batches, 0);
    assert_eq!(again.selection.candidates_kept, 0);
}

#[test]
fn test_hash_pass_without_smart_selection_and_with_limit() {
    let data = tempdir().unwrap();
    let store = tempdir().unwrap();
    let db = store.path().join("records.db");
    populate(data.path());
    ingest(data.path(), &db);

    let pool = WorkerPool::new(PoolConfig::new(1, 10)).unwrap();
    let options = HashPassOptions {
        smart: false,
        limit: Some(4),
        strategy: HashStrategy::Sampling,
        ..HashPassOptions::default()
    };
    let report = run_hash_pass(&pool, &db, Hasher::new(), &options).unwrap();

    assert_eq!(report.selection.total_eligible, 5);
    assert_eq!(report.selection.candidates_kept, 4);
    assert_eq!(report.selection.deferred_by_limit, 1);
    assert_eq!(report.run.total_items, 4);

    let repo = Repository::open(&db).unwrap();
    assert_eq!(repo.count_hashed().unwrap(), 0);
    assert_eq!(repo.count_fingerprinted().unwrap(), 4);
    // Largest first: the 300-byte file is fingerprinted before the 100-byte ones.
    let single = repo
        .find_by_path(&data.path().join("single"))
        .unwrap()
        .unwrap();
    assert!(single.content_hash.is_none());
    assert_eq!(single.partial_strategy, Some(HashStrategy::Sampling));
    drop(repo);

    let exact = HashPassOptions {
        smart: false,
        strategy: HashStrategy::Full,
        ..HashPassOptions::default()
    };
    let upgrade = run_hash_pass(&pool, &db, Hasher::new(), &exact).unwrap();
    assert_eq!(upgrade.run.total_items, 5);
    assert_eq!(Repository::open(&db).unwrap().count_hashed().unwrap(), 5);
}

#[test]
fn test_large_files_differing_outside_samples_keep_distinct_exact_hashes() {
    let data = tempdir().unwrap();
    let store = tempdir().unwrap();
    let db = store.path().join("records.db");
    let size = 2 * 1024 * 1024;
    let content = vec![0x5au8; size];
    let mut other = content.clone();
    other[1_060_921] ^= 0xff;
    fs::write(data.path().join("a.bin"), &content).unwrap();
    fs::write(data.path().join("b.bin"), &other).unwrap();
    ingest(data.path(), &db);

    let pool = WorkerPool::new(PoolConfig::new(2, 1)).unwrap();
    let report = run_hash_pass(&pool, &db, Hasher::new(), &HashPassOptions::default()).unwrap();
    assert_eq!(report.run.totals.succeeded, 2);

    let repo = Repository::open(&db).unwrap();
    let a = repo.find_by_path(&data.path().join("a.bin")).unwrap().unwrap();
    let b = repo.find_by_path(&data.path().join("b.bin")).unwrap().unwrap();
    assert!(a.content_hash.is_none());
    assert!(b.content_hash.is_none());
    assert_eq!(a.partial_hash, b.partial_hash);
    assert_eq!(repo.count_hashed().unwrap(), 0);
    drop(repo);

    let again = run_hash_pass(&pool, &db, Hasher::new(), &HashPassOptions::default()).unwrap();
    assert_eq!(again.run.total_items, 0);

    let exact = HashPassOptions {
        strategy: HashStrategy::Streaming,
        ..HashPassOptions::default()
    };
    run_hash_pass(&pool, &db, Hasher::new(), &exact).unwrap();
    let repo = Repository::open(&db).unwrap();
    let a = repo.find_by_path(&data.path().join("a.bin")).unwrap().unwrap();
    let b = repo.find_by_path(&data.path().join("b.bin")).unwrap().unwrap();
    assert_eq!(
        a.content_hash,
        Some(
            Hasher::new()
                .fingerprint(&data.path().join("a.bin"), HashStrategy::Full)
                .unwrap()
        )
    );
    assert_ne!(a.content_hash, b.content_hash);
}

#[test]
fn test_deleted_file_is_skipped_not_failed() {
    let data = tempdir().unwrap();
    let store = tempdir().unwrap();
    let db = store.path().join("records.db");
    populate(data.path());
    ingest(data.path(), &db);
    fs::remove_file(data.path().join("a3")).unwrap();

    let pool = WorkerPool::new(PoolConfig::new(4, 1)).unwrap();
    let report = run_hash_pass(&pool, &db, Hasher::new(), &HashPassOptions::default()).unwrap();

    assert_eq!(report.run.totals.succeeded, 2);
    assert_eq!(report.run.totals.skipped, 1);
    assert_eq!(report.run.totals.failed, 0);
    assert!(report.run.totals.skip_details[0].item.ends_with("a3"));
}

#[test]
fn test_modified_file_loses_stale_hash_on_reingest() {
    let data = tempdir().unwrap();
    let store = tempdir().unwrap();
    let db = store.path().join("records.db");
    populate(data.path());
    ingest(data.path(), &db);

    let pool = WorkerPool::new(PoolConfig::default()).unwrap();
    run_hash_pass(&pool, &db, Hasher::new(), &HashPassOptions::default()).unwrap();

    let touched = data.path().join("a1");
    set_file_mtime(&touched, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();
    ingest(data.path(), &db);

    let repo = Repository::open(&db).unwrap();
    let a1 = repo.find_by_path(&touched).unwrap().unwrap();
    let a2 = repo.find_by_path(&data.path().join("a2")).unwrap().unwrap();
    assert!(a1.content_hash.is_none());
    assert!(a1.quick_hash.is_none());
    assert!(a2.content_hash.is_some());
    assert_eq!(repo.count_records().unwrap(), 5);
}

#[test]
fn test_stored_candidates_verify_like_a_direct_scan() {
    let data = tempdir().unwrap();
    let store = tempdir().unwrap();
    let db = store.path().join("records.db");
    populate(data.path());
    ingest(data.path(), &db);

    let repo = Repository::open(&db).unwrap();
    let buckets = repo.duplicate_candidates_by_size(1).unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[&100].len(), 3);

    let finder = DuplicateFinder::with_defaults();
    let records = buckets.into_values().flatten().collect();
    let (from_store, _) = finder.find_duplicates_from_records(records).unwrap();
    let (direct, _) = finder.find_duplicates(data.path()).unwrap();

    assert_eq!(from_store.len(), 1);
    assert_eq!(from_store[0].paths(), direct[0].paths());
    assert_eq!(from_store[0].hash, direct[0].hash);
}
