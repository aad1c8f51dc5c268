//! Scanner module for file inventory and content fingerprinting.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk (the inventory source)
//! - Content fingerprinting with BLAKE3 under selectable strategies
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal producing [`FileRecord`]s
//! - [`hasher`]: Fingerprint strategies (full, quick, streaming, sampling, smart)
//!
//! # Example
//!
//! ```no_run
//! use dupewave::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     min_size: Some(1024),  // Skip files under 1KB
//!     skip_hidden: true,     // Skip hidden files
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for record in walker.walk() {
//!     match record {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{
    hash_to_hex, HashParams, HashStrategy, Hasher, SmartFallback, DEFAULT_QUICK_BYTES,
};
pub use walker::Walker;

/// One file discovered by the inventory source.
///
/// Hash fields are only ever filled in from a [`Hasher`] result (or loaded
/// back from the repository); nothing else mutates a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repository row id, when the record came from (or was stored in) the repository
    pub id: Option<i64>,
    /// Path to the file (unique within one scan)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
    /// Last access time, if the platform reports it
    pub accessed: Option<SystemTime>,
    /// Creation (or inode change) time, if the platform reports it
    pub created: Option<SystemTime>,
    /// Exact content fingerprint
    pub content_hash: Option<String>,
    /// Quick (first + last bytes) fingerprint
    pub quick_hash: Option<String>,
    /// Probabilistic fingerprint stored when the primary strategy was not exact
    pub partial_hash: Option<String>,
    /// Strategy that produced `partial_hash`
    pub partial_strategy: Option<HashStrategy>,
}

impl FileRecord {
    /// Create a new record with no timestamps beyond `modified` and no hashes.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            id: None,
            path,
            size,
            modified,
            accessed: None,
            created: None,
            content_hash: None,
            quick_hash: None,
            partial_hash: None,
            partial_strategy: None,
        }
    }

    /// Build a record from filesystem metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            id: None,
            path,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            accessed: metadata.accessed().ok(),
            created: metadata.created().ok(),
            content_hash: None,
            quick_hash: None,
            partial_hash: None,
            partial_strategy: None,
        }
    }

    /// Attach a repository id.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Path rendered for logs and detail lists.
    #[must_use]
    pub fn label(&self) -> String {
        self.path.display().to_string()
    }
}

/// Configuration for directory walking.
///
/// Controls filtering and symlink handling.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    /// These are applied in addition to any .gitignore file in the root.
    pub ignore_patterns: Vec<String>,
}

impl WalkerConfig {
    /// Create a new configuration from CLI arguments.
    #[must_use]
    pub fn new(
        follow_symlinks: bool,
        skip_hidden: bool,
        min_size: Option<u64>,
        max_size: Option<u64>,
        ignore_patterns: Vec<String>,
    ) -> Self {
        Self {
            follow_symlinks,
            skip_hidden,
            min_size,
            max_size,
            ignore_patterns,
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A file could not be fingerprinted.
    #[error(transparent)]
    HashError(#[from] HashError),
}

/// Errors that can occur while fingerprinting one file.
///
/// Always scoped to a single item: callers drop the item and carry on.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: Arc::new(err),
            },
        }
    }

    /// Path of the file that failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(path) | Self::PermissionDenied(path) => path,
            Self::Io { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_new() {
        let record = FileRecord::new(PathBuf::from("/test/file.txt"), 1024, SystemTime::now());

        assert_eq!(record.path, PathBuf::from("/test/file.txt"));
        assert_eq!(record.size, 1024);
        assert!(record.id.is_none());
        assert!(record.content_hash.is_none());
        assert!(record.quick_hash.is_none());
    }

    #[test]
    fn test_file_record_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"12345").unwrap();
        let metadata = std::fs::metadata(&path).unwrap();

        let record = FileRecord::from_metadata(path.clone(), &metadata).with_id(7);
        assert_eq!(record.size, 5);
        assert_eq!(record.id, Some(7));
        assert_eq!(record.label(), path.display().to_string());
    }

    #[test]
    fn test_walker_config_default() {
        let config = WalkerConfig::default();

        assert!(!config.follow_symlinks);
        assert!(!config.skip_hidden);
        assert!(config.min_size.is_none());
        assert!(config.max_size.is_none());
        assert!(config.ignore_patterns.is_empty());
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::PermissionDenied(PathBuf::from("/test"));
        assert_eq!(err.to_string(), "Permission denied: /test");

        let err = ScanError::NotADirectory(PathBuf::from("/file.txt"));
        assert_eq!(err.to_string(), "Not a directory: /file.txt");
    }

    #[test]
    fn test_hash_error_from_io_classifies_kind() {
        let path = Path::new("/gone");
        let err = HashError::from_io(path, std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(err, HashError::NotFound(_)));
        assert_eq!(err.path(), path);

        let err = HashError::from_io(
            path,
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, HashError::PermissionDenied(_)));

        let err = HashError::from_io(path, std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, HashError::Io { .. }));
        assert_eq!(err.to_string(), format!("I/O error for /gone: {}", std::io::Error::from(std::io::ErrorKind::UnexpectedEof)));
    }
}
