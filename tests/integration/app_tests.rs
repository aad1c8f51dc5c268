use clap::Parser;
use dupewave::cli::Cli;
use dupewave::error::ExitCode;
use dupewave::run_app;
use dupewave::store::Repository;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    data: std::path::PathBuf,
    db: std::path::PathBuf,
    config: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("one.txt"), b"same content").unwrap();
    fs::write(data.join("two.txt"), b"same content").unwrap();
    fs::write(data.join("three.txt"), b"other stuff!").unwrap();
    fs::write(data.join("solo.txt"), b"solo").unwrap();

    let config = dir.path().join("config.toml");
    fs::write(&config, "worker_count = 2\nbatch_size = 2\n").unwrap();

    Fixture {
        db: dir.path().join("records.db"),
        data,
        config,
        _dir: dir,
    }
}

fn run(config: &Path, args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["dupewave", "-q", "--no-color", "--config", config.to_str().unwrap()];
    argv.extend_from_slice(args);
    run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_scan_command_exit_codes() {
    let fx = fixture();
    let data = fx.data.to_str().unwrap();

    assert_eq!(run(&fx.config, &["scan", data]).unwrap(), ExitCode::Success);
    assert_eq!(
        run(&fx.config, &["scan", data, "--min-size", "1KB"]).unwrap(),
        ExitCode::NoDuplicates
    );
    assert_eq!(
        run(&fx.config, &["scan", data, "--output", "json"]).unwrap(),
        ExitCode::Success
    );
}

#[test]
fn test_scan_missing_path_is_an_error() {
    let fx = fixture();
    let missing = fx.data.join("absent");
    let err = run(&fx.config, &["scan", missing.to_str().unwrap()]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_ingest_hash_dupes_pipeline() {
    let fx = fixture();
    let data = fx.data.to_str().unwrap();
    let db = fx.db.to_str().unwrap();

    assert_eq!(run(&fx.config, &["ingest", data, "--db", db]).unwrap(), ExitCode::Success);
    assert_eq!(Repository::open(&fx.db).unwrap().count_records().unwrap(), 4);

    assert_eq!(
        run(&fx.config, &["hash", "--db", db, "--output", "json"]).unwrap(),
        ExitCode::Success
    );
    let repo = Repository::open(&fx.db).unwrap();
    assert_eq!(repo.count_hashed().unwrap(), 3);
    drop(repo);

    assert_eq!(
        run(&fx.config, &["dupes", "--db", db, "--output", "csv"]).unwrap(),
        ExitCode::Success
    );
}

#[test]
fn test_hash_requires_existing_database() {
    let fx = fixture();
    let db = fx.db.to_str().unwrap();
    assert!(run(&fx.config, &["hash", "--db", db]).is_err());
    assert!(!fx.db.exists());
}

#[test]
fn test_invalid_config_file_fails_before_work() {
    let fx = fixture();
    fs::write(&fx.config, "worker_count = 0\n").unwrap();
    let data = fx.data.to_str().unwrap();
    assert!(run(&fx.config, &["scan", data]).is_err());
}
