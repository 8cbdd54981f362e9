//! Signal handling for graceful shutdown
//!
//! Provides Ctrl+C handling with two-phase shutdown:
//! - First Ctrl+C: cancel the session, let in-flight test runs finish
//! - Second Ctrl+C: Force exit with code 130

use std::sync::atomic::{AtomicBool, Ordering};

use affected::CancelToken;

/// Exit codes for CLI commands
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    /// Session ended in the error state
    Failed = 1,
    /// Depth input missing or invalid
    InvalidInput = 2,
    /// User interrupted with Ctrl+C
    Interrupted = 130,
}

/// Set once the first Ctrl+C has been seen
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install Ctrl+C handler for graceful shutdown
///
/// First Ctrl+C cancels `cancel`, which interrupts a pending barrier wait.
/// Second Ctrl+C force-exits with code 130.
pub fn setup_signal_handler(cancel: CancelToken) {
    if let Err(e) = ctrlc::set_handler(move || {
        if INTERRUPTED.swap(true, Ordering::AcqRel) {
            // Second Ctrl+C: force exit
            std::process::exit(ExitCode::Interrupted as i32);
        }
        cancel.cancel();
        eprintln!("\nInterrupted. Waiting for running tests to stop...");
    }) {
        tracing::warn!(error = %e, "Failed to set Ctrl+C handler");
    }
}
