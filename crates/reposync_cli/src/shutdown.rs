use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;
use tokio::sync::watch;

/// Global shutdown flag for graceful termination.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Wakes waiters in `watch` mode as soon as shutdown is requested.
static SHUTDOWN_SIGNAL: LazyLock<watch::Sender<bool>> = LazyLock::new(|| watch::channel(false).0);

/// Check if shutdown has been requested.
#[inline]
pub(crate) fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

/// Receiver that changes once shutdown is requested.
pub(crate) fn subscribe() -> watch::Receiver<bool> {
    SHUTDOWN_SIGNAL.subscribe()
}

/// Request shutdown.
#[inline]
fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
    SHUTDOWN_SIGNAL.send_replace(true);
}

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C lets a running pass finish; the second exits immediately.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing the current pass...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing the current pass");
        }

        request_shutdown();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}
