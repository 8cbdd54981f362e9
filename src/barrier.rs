//! Single-use completion barrier between phase 1 and the controller
//!
//! [`completion`] returns a signal/barrier pair backed by a one-slot channel.
//! The signal may be cloned and handed to several completion paths (process
//! exit callback, launch failure, skip); only the first `release` is
//! delivered. The barrier is consumed by [`Barrier::wait`], so it cannot be
//! reused by a later session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

/// How often a blocked waiter checks its cancel token.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// What phase 1 reported when it released the barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseSignal {
    /// Phase 1 was not requested (or could not stash); synthetic release
    Skipped,
    /// The head-state test process terminated
    Completed { exit_code: Option<i32>, success: bool },
    /// Phase 1 could not be configured or started
    Failed(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WaitError {
    #[error("interrupted while waiting for phase 1 to finish")]
    Interrupted,
    #[error("phase 1 ended without signalling completion")]
    Abandoned,
}

/// Cooperative cancellation flag shared with the Ctrl+C handler.
///
/// Once set it stays set; nothing in this crate clears it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Writer side. Cloneable; releases at most once across all clones.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    tx: Sender<PhaseSignal>,
    fired: Arc<AtomicBool>,
}

impl CompletionSignal {
    /// Release the barrier. Returns `false` if it was already released.
    pub fn release(&self, signal: PhaseSignal) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            tracing::debug!(?signal, "Barrier already released, ignoring");
            return false;
        }
        tracing::debug!(?signal, "Releasing barrier");
        // Capacity is one and only the first release sends, so this cannot
        // block. A dropped barrier just means nobody is waiting any more.
        let _ = self.tx.try_send(signal);
        true
    }

    pub fn is_released(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Waiter side. Single use.
#[derive(Debug)]
pub struct Barrier {
    rx: Receiver<PhaseSignal>,
}

impl Barrier {
    /// Block until the signal is released.
    ///
    /// Returns [`WaitError::Interrupted`] if `cancel` is set while blocked,
    /// and [`WaitError::Abandoned`] if every signal clone was dropped without
    /// releasing. The cancel flag is left set for outer code to observe.
    pub fn wait(self, cancel: &CancelToken) -> Result<PhaseSignal, WaitError> {
        let _span = tracing::info_span!("barrier_wait").entered();
        loop {
            match self.rx.recv_timeout(CANCEL_POLL) {
                Ok(signal) => return Ok(signal),
                Err(RecvTimeoutError::Timeout) => {
                    if cancel.is_cancelled() {
                        tracing::warn!("Barrier wait interrupted");
                        return Err(WaitError::Interrupted);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Err(WaitError::Abandoned),
            }
        }
    }
}

/// Create a fresh signal/barrier pair with exactly one release available.
pub fn completion() -> (CompletionSignal, Barrier) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (
        CompletionSignal {
            tx,
            fired: Arc::new(AtomicBool::new(false)),
        },
        Barrier { rx },
    )
}
