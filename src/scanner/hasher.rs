//! BLAKE3 fingerprinting under selectable strategies.
//!
//! # Overview
//!
//! [`Hasher`] computes a content fingerprint for one file. The strategy is a
//! closed [`HashStrategy`] variant dispatched through [`Hasher::fingerprint`]:
//!
//! | Strategy | I/O | Exact |
//! |---|---|---|
//! | `Full` | whole file (memory-mapped above a threshold) | yes |
//! | `Quick` | first + last K bytes | no |
//! | `Streaming` | whole file through a fixed buffer | yes, same output as `Full` |
//! | `Sampling` | N evenly spaced windows | no |
//! | `Smart` | `Full` below a size threshold, else the fallback | depends on size |
//!
//! Only exact strategies may establish that two files are identical. Quick
//! and sampling fingerprints fold the file size in, so they never collide
//! across sizes, but they can collide between files of equal size.
//!
//! # Example
//!
//! ```no_run
//! use dupewave::scanner::{Hasher, HashStrategy};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let quick = hasher.fingerprint(Path::new("a.bin"), HashStrategy::Quick).unwrap();
//! let full = hasher.fingerprint(Path::new("a.bin"), HashStrategy::Full).unwrap();
//! assert_eq!(full.len(), 64);
//! # let _ = quick;
//! ```

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use clap::ValueEnum;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use super::HashError;

/// Default number of bytes read from each end of a file by the quick strategy.
pub const DEFAULT_QUICK_BYTES: usize = 8192;

/// Default number of windows read by the sampling strategy.
pub const DEFAULT_SAMPLE_WINDOWS: usize = 16;

/// Default size of each sampling window.
pub const DEFAULT_SAMPLE_WINDOW_SIZE: usize = 4096;

/// Files below this size are fully hashed by the smart strategy.
pub const DEFAULT_SMART_THRESHOLD: u64 = 1024 * 1024;

/// Read buffer used by streaming hashes.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Files at or above this size are memory-mapped by the full strategy.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

/// BLAKE3 digest.
pub type Hash = [u8; 32];

/// Fingerprinting strategy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum HashStrategy {
    /// Cryptographic digest of the entire content.
    Full,
    /// Digest of the first and last K bytes plus the size.
    Quick,
    /// Full digest computed with a bounded read buffer.
    Streaming,
    /// Digest of evenly spaced windows plus the size.
    Sampling,
    /// Full for small files, otherwise the configured fallback.
    #[default]
    Smart,
}

impl HashStrategy {
    /// Whether two equal fingerprints under this strategy prove equal content.
    ///
    /// `Smart` is not exact as a policy: it resolves to a probabilistic
    /// strategy for large files.
    #[must_use]
    pub fn is_exact(self) -> bool {
        match self {
            Self::Full | Self::Streaming => true,
            Self::Quick | Self::Sampling | Self::Smart => false,
        }
    }

    /// Lowercase name used in logs and reports.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Quick => "quick",
            Self::Streaming => "streaming",
            Self::Sampling => "sampling",
            Self::Smart => "smart",
        }
    }

    /// Inverse of [`HashStrategy::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "full" => Some(Self::Full),
            "quick" => Some(Self::Quick),
            "streaming" => Some(Self::Streaming),
            "sampling" => Some(Self::Sampling),
            "smart" => Some(Self::Smart),
            _ => None,
        }
    }
}

impl std::fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Strategy the smart policy uses for files at or above its threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum SmartFallback {
    /// Evenly spaced windows.
    #[default]
    Sampling,
    /// First and last bytes only.
    Quick,
}

impl From<SmartFallback> for HashStrategy {
    fn from(fallback: SmartFallback) -> Self {
        match fallback {
            SmartFallback::Sampling => HashStrategy::Sampling,
            SmartFallback::Quick => HashStrategy::Quick,
        }
    }
}

/// Tunables shared by every strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashParams {
    /// Bytes read from each end of the file by `Quick`.
    pub quick_bytes: usize,
    /// Number of windows read by `Sampling`.
    pub sample_windows: usize,
    /// Size of each `Sampling` window.
    pub sample_window_size: usize,
    /// Size below which `Smart` uses `Full`.
    pub smart_threshold: u64,
    /// What `Smart` uses for files at or above the threshold.
    pub smart_fallback: SmartFallback,
    /// Read buffer for streaming hashes.
    pub buffer_size: usize,
    /// Memory-map large files in `Full`.
    pub use_mmap: bool,
    /// Size at which `Full` switches to memory mapping.
    pub mmap_threshold: u64,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            quick_bytes: DEFAULT_QUICK_BYTES,
            sample_windows: DEFAULT_SAMPLE_WINDOWS,
            sample_window_size: DEFAULT_SAMPLE_WINDOW_SIZE,
            smart_threshold: DEFAULT_SMART_THRESHOLD,
            smart_fallback: SmartFallback::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            use_mmap: true,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }
}

/// Content fingerprinting for single files.
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    params: HashParams,
}

impl Hasher {
    /// Create a hasher with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hasher with the given parameters.
    ///
    /// Zero-sized knobs are clamped to 1 so every strategy makes progress.
    #[must_use]
    pub fn with_params(mut params: HashParams) -> Self {
        params.quick_bytes = params.quick_bytes.max(1);
        params.sample_windows = params.sample_windows.max(1);
        params.sample_window_size = params.sample_window_size.max(1);
        params.buffer_size = params.buffer_size.max(1);
        Self { params }
    }

    /// Enable or disable memory mapping for full hashes.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.params.use_mmap = enabled;
        self
    }

    /// Set the size at which full hashes switch to memory mapping.
    #[must_use]
    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.params.mmap_threshold = threshold;
        self
    }

    /// Current parameters.
    #[must_use]
    pub fn params(&self) -> &HashParams {
        &self.params
    }

    /// Resolve `Smart` to the concrete strategy used for a file of `size` bytes.
    ///
    /// Every other strategy resolves to itself.
    #[must_use]
    pub fn resolve(&self, strategy: HashStrategy, size: u64) -> HashStrategy {
        match strategy {
            HashStrategy::Smart if size < self.params.smart_threshold => HashStrategy::Full,
            HashStrategy::Smart => self.params.smart_fallback.into(),
            other => other,
        }
    }

    /// Compute the fingerprint of `path` under `strategy` as lowercase hex.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the file is missing, unreadable, or shrinks
    /// while it is being read.
    pub fn fingerprint(&self, path: &Path, strategy: HashStrategy) -> Result<String, HashError> {
        let digest = match strategy {
            HashStrategy::Full => self.full_hash(path)?,
            HashStrategy::Quick => self.quick_hash(path)?,
            HashStrategy::Streaming => self.streaming_hash(path)?,
            HashStrategy::Sampling => self.sampling_hash(path)?,
            HashStrategy::Smart => {
                let size = std::fs::metadata(path)
                    .map_err(|e| HashError::from_io(path, e))?
                    .len();
                let resolved = self.resolve(strategy, size);
                log::trace!(
                    "Smart strategy resolved to {} for {} ({} bytes)",
                    resolved,
                    path.display(),
                    size
                );
                return self.fingerprint(path, resolved);
            }
        };
        Ok(hash_to_hex(&digest))
    }

    /// Digest of the entire file.
    ///
    /// Files at or above the mmap threshold are memory-mapped and hashed with
    /// BLAKE3's multi-threaded update; smaller files are streamed.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] on any I/O failure.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        if self.params.use_mmap && len > 0 && len >= self.params.mmap_threshold {
            // SAFETY: the map is read-only and dropped before returning. A
            // concurrent writer can change what we read but not memory safety
            // of the slice for the duration of the hash.
            match unsafe { Mmap::map(&file) } {
                Ok(map) => {
                    log::trace!("Hashing {} via mmap ({} bytes)", path.display(), len);
                    let mut hasher = blake3::Hasher::new();
                    hasher.update_rayon(&map);
                    return Ok(*hasher.finalize().as_bytes());
                }
                Err(e) => {
                    log::debug!(
                        "mmap failed for {}, falling back to streaming: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        self.stream_file(path, file, len)
    }

    /// Digest of the entire file read through a bounded buffer.
    ///
    /// Produces the same digest as [`Hasher::full_hash`].
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] on any I/O failure.
    pub fn streaming_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();
        self.stream_file(path, file, len)
    }

    /// Digest of size + first K bytes + last K bytes.
    ///
    /// Files of 2K bytes or less are hashed whole (after the size).
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] on any I/O failure.
    pub fn quick_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();
        let k = self.params.quick_bytes as u64;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&len.to_le_bytes());

        if len <= 2 * k {
            let mut content = Vec::with_capacity(len as usize);
            file.read_to_end(&mut content)
                .map_err(|e| HashError::from_io(path, e))?;
            ensure_len(path, content.len() as u64, len)?;
            hasher.update(&content);
            return Ok(*hasher.finalize().as_bytes());
        }

        let mut window = vec![0u8; self.params.quick_bytes];
        read_window(path, &mut file, 0, &mut window)?;
        hasher.update(&window);
        read_window(path, &mut file, len - k, &mut window)?;
        hasher.update(&window);

        Ok(*hasher.finalize().as_bytes())
    }

    /// Digest of size + N windows spaced evenly from the start to the end.
    ///
    /// Files no larger than the total window span are hashed whole.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] on any I/O failure.
    pub fn sampling_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();
        let windows = self.params.sample_windows as u64;
        let window_size = self.params.sample_window_size as u64;

        let mut hasher = blake3::Hasher::new();
        hasher.update(&len.to_le_bytes());

        if len <= windows * window_size {
            let mut content = Vec::with_capacity(len as usize);
            file.read_to_end(&mut content)
                .map_err(|e| HashError::from_io(path, e))?;
            ensure_len(path, content.len() as u64, len)?;
            hasher.update(&content);
            return Ok(*hasher.finalize().as_bytes());
        }

        let mut window = vec![0u8; self.params.sample_window_size];
        for offset in sample_offsets(len, windows, window_size) {
            read_window(path, &mut file, offset, &mut window)?;
            hasher.update(&window);
        }

        Ok(*hasher.finalize().as_bytes())
    }

    fn stream_file(&self, path: &Path, mut file: File, expected: u64) -> Result<Hash, HashError> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.params.buffer_size];
        let mut total = 0u64;

        loop {
            let n = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..n]);
            total += n as u64;
        }

        ensure_len(path, total, expected)?;
        Ok(*hasher.finalize().as_bytes())
    }
}

/// Offsets of `windows` windows of `window_size` bytes spread over `len` bytes.
///
/// The first window starts at 0 and the last ends exactly at `len`.
fn sample_offsets(len: u64, windows: u64, window_size: u64) -> impl Iterator<Item = u64> {
    let span = len.saturating_sub(window_size);
    (0..windows).map(move |i| {
        if windows <= 1 {
            0
        } else {
            i * span / (windows - 1)
        }
    })
}

fn read_window(
    path: &Path,
    file: &mut File,
    offset: u64,
    window: &mut [u8],
) -> Result<(), HashError> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| HashError::from_io(path, e))?;
    file.read_exact(window)
        .map_err(|e| HashError::from_io(path, e))
}

/// A file that yields fewer bytes than its metadata promised was truncated
/// (or replaced) mid-read.
fn ensure_len(path: &Path, actual: u64, expected: u64) -> Result<(), HashError> {
    if actual < expected {
        return Err(HashError::from_io(
            path,
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("file shrank while reading ({actual} of {expected} bytes)"),
            ),
        ));
    }
    Ok(())
}

/// Convert a digest to a lowercase hexadecimal string.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}
