//! Process lifecycle state.
//!
//! Only the signal-facing shutdown flag lives here. Registries, caches and
//! counters are owned by the monitoring session, never global.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown has been requested (SIGINT/SIGTERM received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the session waiting in `main`
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

/// Setup the global SIGINT/SIGTERM handler. Call once at program start
///
/// The handler behavior depends on whether a session has been registered:
/// - Before `register_shutdown()`: exit immediately, nothing is running yet
/// - After `register_shutdown()`: set the flag and wake the waiting session
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(tx) = SHUTDOWN_TX.get() {
            crate::log!("watch"; "shutting down...");
            let _ = tx.try_send(());
        } else {
            std::process::exit(0);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set signal handler: {}", e))
}

/// Register the channel the session blocks on until a signal arrives
pub fn register_shutdown(tx: crossbeam::channel::Sender<()>) {
    let _ = SHUTDOWN_TX.set(tx);
}

/// Request shutdown from inside the process (fatal dispatch error, tests)
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
    if let Some(tx) = SHUTDOWN_TX.get() {
        let _ = tx.try_send(());
    }
}

/// Check if shutdown has been requested
///
/// Uses Relaxed ordering: worst case is one more loop iteration
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
