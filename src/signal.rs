//! Ctrl+C handling.
//!
//! A single [`ShutdownHandler`] owns an `AtomicBool` that the walker, the
//! finder and the batch coordinator poll. The flag is only ever observed at
//! safe points: the walker stops yielding, the finder stops between phases
//! and the coordinator stops before dispatching the next wave. A wave that is
//! already running always finishes.
//!
//! ```rust,no_run
//! use dupewave::signal::install_handler;
//! use dupewave::batch::{PoolConfig, WorkerPool};
//!
//! let handler = install_handler().expect("signal handler");
//! let pool = WorkerPool::new(PoolConfig::default())
//!     .unwrap()
//!     .with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code after an interrupt (128 + SIGINT).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag by hand.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Flag to hand to the walker, finder or worker pool.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Lower the flag again.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Failure to register the Ctrl+C hook.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// `ctrlc` refused the handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

/// Install the process-wide Ctrl+C hook, or reuse the one already installed.
///
/// Reusing resets the flag, so repeated in-process runs (tests) start clean.
/// If another hook owns SIGINT, an unhooked handler is returned instead; it
/// still honors [`ShutdownHandler::request_shutdown`].
///
/// # Errors
///
/// Currently always succeeds; the `Result` leaves room for platforms where
/// running without a hook should be fatal.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    let hooked = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing the current wave...");
        let _ = stderr.flush();
        log::info!("Shutdown signal received");
    });

    match hooked {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(GLOBAL_HANDLER.get().cloned().unwrap_or(handler))
        }
        Err(e) => {
            log::debug!("Ctrl+C hook unavailable ({}), using unhooked handler", e);
            let fallback = GLOBAL_HANDLER.get_or_init(ShutdownHandler::new);
            fallback.reset();
            Ok(fallback.clone())
        }
    }
}
