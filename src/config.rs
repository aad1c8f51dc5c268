//! Layered application configuration.
//!
//! Settings are merged with `figment`, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory (missing files are ignored)
//! 3. Environment variables prefixed with `DUPEWAVE_` (e.g. `DUPEWAVE_WORKER_COUNT=8`)
//! 4. CLI flags, applied by the caller after loading
//!
//! ```toml
//! worker_count = 8
//! batch_size = 250
//! strategy = "smart"
//! verify_mode = "quick-then-full"
//! ignore_patterns = ["*.tmp", "node_modules/"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::batch::PoolConfig;
use crate::duplicates::VerifyMode;
use crate::scanner::hasher::{
    DEFAULT_SAMPLE_WINDOWS, DEFAULT_SAMPLE_WINDOW_SIZE, DEFAULT_SMART_THRESHOLD,
};
use crate::scanner::{HashParams, HashStrategy, SmartFallback, WalkerConfig, DEFAULT_QUICK_BYTES};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPEWAVE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Threads used by the finder's hashing pool.
    pub io_threads: usize,
    /// Batches per wave in the hash pass.
    pub worker_count: usize,
    /// Records per batch in the hash pass.
    pub batch_size: usize,
    /// Per-batch wall-clock limit in seconds (unset: wait forever).
    pub batch_timeout_secs: Option<u64>,
    /// Primary strategy of the hash pass.
    pub strategy: HashStrategy,
    /// Strategy the smart policy falls back to for large files.
    pub smart_fallback: SmartFallback,
    /// Verification mode of the finder.
    pub verify_mode: VerifyMode,
    /// Bytes read from each end by the quick hash.
    pub quick_bytes: usize,
    /// Number of windows read by the sampling hash.
    pub sample_windows: usize,
    /// Size of each sampling window in bytes.
    pub sample_window_size: usize,
    /// Files below this size are hashed in full by the smart strategy.
    pub smart_threshold: u64,
    /// Skip records whose size is unique.
    pub smart_selection: bool,
    /// Smallest file size considered.
    pub min_size: u64,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Gitignore-style patterns to exclude.
    pub ignore_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: 4,
            worker_count: 4,
            batch_size: 100,
            batch_timeout_secs: None,
            strategy: HashStrategy::default(),
            smart_fallback: SmartFallback::default(),
            verify_mode: VerifyMode::default(),
            quick_bytes: DEFAULT_QUICK_BYTES,
            sample_windows: DEFAULT_SAMPLE_WINDOWS,
            sample_window_size: DEFAULT_SAMPLE_WINDOW_SIZE,
            smart_threshold: DEFAULT_SMART_THRESHOLD,
            smart_selection: true,
            min_size: 1,
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Build the layered figment without extracting it.
    ///
    /// `path` overrides the default config file location.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                if let Some(default_path) = Self::default_path() {
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, mistyped environment values, or values that
    /// [`validate`](Self::validate) rejects.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
        }
        let config: Config = Self::figment(path)
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        log::debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Names the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.io_threads == 0 {
            bail!("io_threads must be at least 1");
        }
        if self.worker_count == 0 {
            bail!("worker_count must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.quick_bytes == 0 {
            bail!("quick_bytes must be at least 1");
        }
        if self.batch_timeout_secs == Some(0) {
            bail!("batch_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Write the configuration as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Platform config file location (`.../dupewave/config.toml`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupewave").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Hasher parameters derived from this configuration.
    #[must_use]
    pub fn hash_params(&self) -> HashParams {
        HashParams {
            quick_bytes: self.quick_bytes,
            sample_windows: self.sample_windows,
            sample_window_size: self.sample_window_size,
            smart_threshold: self.smart_threshold,
            smart_fallback: self.smart_fallback,
            ..HashParams::default()
        }
    }

    /// Worker pool sizing derived from this configuration.
    #[must_use]
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            worker_count: self.worker_count,
            batch_size: self.batch_size,
            batch_timeout: self.batch_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Walker settings derived from this configuration.
    #[must_use]
    pub fn walker_config(&self, max_size: Option<u64>) -> WalkerConfig {
        WalkerConfig::new(
            self.follow_symlinks,
            self.skip_hidden,
            None,
            max_size,
            self.ignore_patterns.clone(),
        )
    }
}
