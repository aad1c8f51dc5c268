use dupewave::config::Config;
use dupewave::duplicates::VerifyMode;
use dupewave::scanner::{HashStrategy, SmartFallback};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Figment directly, without Env, so other tests' variables cannot leak in
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.worker_count, 4);
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.strategy, HashStrategy::Smart);
    assert_eq!(config.verify_mode, VerifyMode::QuickThenFull);
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("DUPEWAVE_SAMPLE_WINDOWS", "32");
    std::env::set_var("DUPEWAVE_SMART_FALLBACK", "quick");

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("DUPEWAVE_"));
    let config: Config = figment.extract().unwrap();

    assert_eq!(config.sample_windows, 32);
    assert_eq!(config.smart_fallback, SmartFallback::Quick);

    std::env::remove_var("DUPEWAVE_SAMPLE_WINDOWS");
    std::env::remove_var("DUPEWAVE_SMART_FALLBACK");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
worker_count = 8
batch_size = 250
batch_timeout_secs = 30
strategy = "streaming"
verify_mode = "full-only"
ignore_patterns = ["*.tmp", "node_modules/"]
"#,
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(config.worker_count, 8);
    assert_eq!(config.batch_size, 250);
    assert_eq!(config.batch_timeout_secs, Some(30));
    assert_eq!(config.strategy, HashStrategy::Streaming);
    assert_eq!(config.verify_mode, VerifyMode::FullOnly);
    assert_eq!(config.ignore_patterns, vec!["*.tmp", "node_modules/"]);
    // Untouched keys keep their defaults
    assert_eq!(config.io_threads, 4);
}

#[test]
fn test_config_load_rejects_invalid_values() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "batch_size = 0\n").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();
    assert!(err.to_string().contains("batch_size"));
}

#[test]
fn test_config_load_rejects_malformed_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "worker_count = \"many\"\n").unwrap();

    assert!(Config::load(Some(&config_path)).is_err());
}

#[test]
fn test_config_save_and_reload() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let config = Config {
        worker_count: 6,
        smart_selection: false,
        min_size: 4096,
        ..Config::default()
    };
    config.save_to(&config_path).unwrap();

    let loaded: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();
    assert_eq!(loaded, config);
}
