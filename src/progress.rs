//! Progress reporting utilities using indicatif.
//!
//! The core pipeline only emits events through [`ProgressCallback`]; the
//! [`Progress`] struct turns those events into terminal progress bars.
//!
//! Phases emitted by the crate:
//! - `"walking"`: directory traversal (spinner, total unknown)
//! - `"quick"`: quick-hash prefilter
//! - `"full"`: full-content verification
//! - `"batches"`: the batch coordinator's hash pass
//!
//! # Accessible Mode
//!
//! When accessible mode is enabled, progress reporting uses simplified output:
//! - No spinners or animations
//! - ASCII bars
//! - Reduced update frequency for screen reader compatibility

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for the detection phases and the batch coordinator.
///
/// Implement this trait to receive progress updates. Implementations must be
/// cheap: events are emitted from hashing threads and the coordinator loop.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "quick", "full", "batches")
    /// * `total` - Total number of items to process (0 if unknown)
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called as items are processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Items processed so far in this phase
    /// * `path` - Item just processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been hashed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to update the progress message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
///
/// Keeps at most one bar per phase and routes events to the bar of the
/// phase most recently started.
pub struct Progress {
    multi: MultiProgress,
    walking: Mutex<Option<ProgressBar>>,
    quick: Mutex<Option<ProgressBar>>,
    full: Mutex<Option<ProgressBar>>,
    batches: Mutex<Option<ProgressBar>>,
    prefix: Mutex<String>,
    quiet: bool,
    accessible: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupewave::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self::with_accessible(quiet, false)
    }

    /// Create a new progress reporter with accessible mode.
    #[must_use]
    pub fn with_accessible(quiet: bool, accessible: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            walking: Mutex::new(None),
            quick: Mutex::new(None),
            full: Mutex::new(None),
            batches: Mutex::new(None),
            prefix: Mutex::new(String::new()),
            quiet,
            accessible,
        }
    }

    /// Check if accessible mode is enabled.
    #[must_use]
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            "walking" => Some(&self.walking),
            "quick" => Some(&self.quick),
            "full" => Some(&self.full),
            "batches" => Some(&self.batches),
            _ => None,
        }
    }

    /// Run `f` on the bar of the latest active phase.
    fn with_active_bar(&self, f: impl FnOnce(&ProgressBar)) {
        for slot in [&self.batches, &self.full, &self.quick, &self.walking] {
            if let Ok(guard) = slot.lock() {
                if let Some(ref pb) = *guard {
                    f(pb);
                    return;
                }
            }
        }
    }

    fn spinner_style(&self) -> ProgressStyle {
        if self.accessible {
            ProgressStyle::with_template("{msg} [{elapsed_precise}] {pos} files")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        } else {
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        }
    }

    fn bar_style(&self, color: &str) -> ProgressStyle {
        if self.accessible {
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        } else {
            ProgressStyle::with_template(&format!(
                "[{{elapsed_precise}}] [{{bar:40.{color}/blue}}] {{pos}}/{{len}} ({{percent}}%) {{msg}} (ETA: {{eta}})"
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-")
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            "walking" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(self.spinner_style());
                pb.set_message("Walking directory");
                let tick_rate = if self.accessible { 500 } else { 100 };
                pb.enable_steady_tick(Duration::from_millis(tick_rate));
                pb
            }
            "quick" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(self.bar_style("cyan"));
                pb.set_message("Quick hashing");
                pb
            }
            "full" => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(self.bar_style("green"));
                pb.set_message("Full hashing");
                pb
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(self.bar_style("magenta"));
                pb.set_message(phase.to_string());
                pb
            }
        };

        if let Some(slot) = self.slot(phase) {
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(pb);
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        let display_msg = match self.prefix.lock() {
            Ok(prefix) if !prefix.is_empty() => format!("{}: {}", *prefix, truncate_path(path, 30)),
            _ => truncate_path(path, 30),
        };

        self.with_active_bar(|pb| {
            pb.set_position(current as u64);
            pb.set_message(display_msg);
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let message = match phase {
            "walking" => "Walking complete",
            "quick" => "Quick hashing complete",
            "full" => "Full hashing complete",
            "batches" => "Batches complete",
            _ => "Done",
        };

        if let Some(slot) = self.slot(phase) {
            if let Some(pb) = slot.lock().ok().and_then(|mut guard| guard.take()) {
                pb.finish_with_message(message);
            }
        }
        if let Ok(mut prefix) = self.prefix.lock() {
            prefix.clear();
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Ok(mut prefix) = self.prefix.lock() {
            *prefix = message.to_string();
        }
        self.with_active_bar(|pb| pb.set_message(message.to_string()));
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len + 3 - max_len)
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_path_short() {
        assert_eq!(truncate_path("/a/b.txt", 30), "/a/b.txt");
    }

    #[test]
    fn test_truncate_path_long() {
        let long = "/very/long/directory/structure/that/keeps/going/file.txt";
        assert_eq!(truncate_path(long, 30), ".../file.txt");
    }

    #[test]
    fn test_truncate_path_long_file_name() {
        let name = format!("/{}", "é".repeat(40));
        let out = truncate_path(&name, 10);
        assert!(out.starts_with("..."));
        assert_eq!(out.chars().count(), 10);
    }

    #[test]
    fn test_quiet_progress_ignores_events() {
        let progress = Progress::new(true);
        progress.on_phase_start("quick", 10);
        progress.on_progress(1, "/x");
        progress.on_phase_end("quick");
        assert!(progress.quick.lock().unwrap().is_none());
    }

    #[test]
    fn test_phase_lifecycle() {
        let progress = Progress::with_accessible(false, true);
        assert!(progress.is_accessible());
        progress.on_phase_start("batches", 5);
        progress.on_message("wave 1/1");
        progress.on_progress(3, "/some/file");
        assert!(progress.batches.lock().unwrap().is_some());
        progress.on_phase_end("batches");
        assert!(progress.batches.lock().unwrap().is_none());
    }
}
