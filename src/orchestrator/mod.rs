//! Two-phase run controller
//!
//! ```text
//! Idle -> ImpactComputed -> Phase1Running | Phase1Skipped -> AwaitingBarrier
//!      -> Restoring -> Phase2Running -> Done
//! ```
//!
//! `Aborted` ends a session whose impact is empty; `Error` ends a session on
//! an unrecoverable failure. The worker thread runs everything up to the
//! barrier. Restoring and phase 2 are a single task on the foreground queue,
//! so the barrier wait is the only place the worker blocks.

mod foreground;

pub use foreground::{foreground, ForegroundHandle, ForegroundQueue, Level, Notice, Notifier};

use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::barrier::{completion, CancelToken, PhaseSignal, WaitError};
use crate::error::SessionError;
use crate::impact::{changed_listing, tests_listing};
use crate::session::{RunSession, TestPattern};
use crate::tracker::ChangeImpactEngine;
use crate::vcs::SnapshotCoordinator;

/// Title of every informational notice.
pub const NOTICE_TITLE: &str = "Affected Tests";

/// Posted when a session starts.
pub const START_MESSAGE: &str = "The run begins. If you chose to check the previous commit, \
the first report is for the unchanged files.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SessionState {
    Idle,
    ImpactComputed,
    Phase1Running,
    Phase1Skipped,
    AwaitingBarrier,
    Restoring,
    Phase2Running,
    Done,
    Aborted,
    Error,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Aborted | SessionState::Error
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A validated change-tracking depth (at least 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Depth(u32);

impl Depth {
    /// Parse user input. Empty, non-numeric and non-positive input is
    /// rejected before any work starts.
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let trimmed = input.trim();
        match trimmed.parse::<u32>() {
            Ok(d) if d > 0 => Ok(Depth(d)),
            _ => Err(SessionError::InvalidInput(input.to_string())),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// The two user inputs of a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionRequest {
    pub depth: Depth,
    /// Run the selected tests against the unchanged state first
    pub check_previous: bool,
}

/// What happened in a session.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SessionReport {
    /// Every state entered, in order
    pub states: Vec<SessionState>,
    /// Message of the error that ended the session, if any
    pub error: Option<String>,
    pub interrupted: bool,
    pub patterns: Vec<TestPattern>,
}

impl SessionReport {
    pub fn final_state(&self) -> Option<SessionState> {
        self.states.last().copied()
    }
}

/// Shared record of a session's progress, written by the worker and the
/// foreground task, read by whoever started the session.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<SessionReport>>);

impl Journal {
    fn enter(&self, state: SessionState) {
        tracing::info!(state = %state, "Session state");
        self.0
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .states
            .push(state);
    }

    fn fail(&self, error: &SessionError) {
        {
            let mut report = self.0.lock().unwrap_or_else(|p| p.into_inner());
            report.error = Some(error.to_string());
            if matches!(error, SessionError::InterruptedWait(_)) {
                report.interrupted = true;
            }
        }
        self.enter(SessionState::Error);
    }

    fn set_patterns(&self, patterns: Vec<TestPattern>) {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).patterns = patterns;
    }

    pub fn report(&self) -> SessionReport {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

/// Drives one session.
pub struct Orchestrator<E> {
    engine: Arc<Mutex<E>>,
    snapshots: SnapshotCoordinator,
    ui: ForegroundHandle,
    cancel: CancelToken,
    journal: Journal,
}

impl<E: ChangeImpactEngine + 'static> Orchestrator<E> {
    pub fn new(
        engine: Arc<Mutex<E>>,
        snapshots: SnapshotCoordinator,
        ui: ForegroundHandle,
        cancel: CancelToken,
    ) -> Self {
        Self {
            engine,
            snapshots,
            ui,
            cancel,
            journal: Journal::default(),
        }
    }

    /// Handle for reading the session's progress after it ends.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Run the session on a named worker thread.
    pub fn spawn(self, request: SessionRequest) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("affected-worker".into())
            .spawn(move || self.run(request))
    }

    /// Run the session on the calling thread.
    ///
    /// Returns once the restore/phase-2 task has been posted (or the session
    /// ended earlier). The session is finished when that task has run on the
    /// foreground queue.
    pub fn run(self, request: SessionRequest) {
        let _span = tracing::info_span!(
            "session",
            depth = request.depth.get(),
            check_previous = request.check_previous
        )
        .entered();
        let journal = self.journal.clone();
        journal.enter(SessionState::Idle);
        self.ui.info(NOTICE_TITLE, START_MESSAGE);

        // Fresh pattern set for every session
        let session = Arc::new(RunSession::new());

        match self.compute_impact(request.depth) {
            Ok(true) => journal.enter(SessionState::ImpactComputed),
            Ok(false) => {
                self.ui
                    .info(NOTICE_TITLE, "No affected tests found for the tracked changes.");
                journal.enter(SessionState::Aborted);
                return;
            }
            Err(e) => {
                self.ui.error(e.title(), e.to_string());
                journal.fail(&e);
                return;
            }
        }

        let (signal, barrier) = completion();
        let mut stashed = false;
        let mut failure: Option<SessionError> = None;

        if request.check_previous {
            match self.snapshots.stash_current_changes() {
                Ok(created) => {
                    stashed = created;
                    journal.enter(SessionState::Phase1Running);
                    let result = self
                        .engine
                        .lock()
                        .unwrap_or_else(|p| p.into_inner())
                        .run_tests_on_head_files(&session, signal.clone());
                    if let Err(e) = result {
                        self.ui.error(e.title(), e.to_string());
                        failure = Some(e);
                    }
                }
                Err(e) => {
                    // Cannot reach the unchanged state; go straight to phase 2
                    self.ui.error(e.title(), e.to_string());
                    journal.enter(SessionState::Phase1Skipped);
                    signal.release(PhaseSignal::Skipped);
                }
            }
        } else {
            journal.enter(SessionState::Phase1Skipped);
            signal.release(PhaseSignal::Skipped);
        }
        drop(signal);

        journal.enter(SessionState::AwaitingBarrier);
        let mut interrupted = None;
        match barrier.wait(&self.cancel) {
            Ok(PhaseSignal::Failed(msg)) => {
                tracing::warn!(msg, "Phase 1 failed");
                if failure.is_none() {
                    failure = Some(SessionError::ExecutionEngineUnavailable(msg));
                }
            }
            Ok(signal) => tracing::info!(?signal, "Phase 1 finished"),
            Err(WaitError::Interrupted) => {
                let e = SessionError::InterruptedWait(WaitError::Interrupted.to_string());
                self.ui.error(e.title(), e.to_string());
                interrupted = Some(e);
            }
            Err(e @ WaitError::Abandoned) => {
                if failure.is_none() {
                    failure = Some(SessionError::ExecutionEngineUnavailable(e.to_string()));
                }
            }
        }

        journal.enter(SessionState::Restoring);
        let Orchestrator {
            engine,
            snapshots,
            ui,
            ..
        } = self;
        let task_ui = ui.clone();
        let task_journal = journal.clone();
        let posted = ui.invoke_later(move || {
            restore_then_run_current(
                &engine,
                &snapshots,
                &task_ui,
                &task_journal,
                &session,
                stashed,
                interrupted.or(failure),
            );
        });
        if !posted {
            let e = SessionError::ExecutionEngineUnavailable("foreground queue closed".into());
            tracing::error!(error = %e, "Could not schedule restore");
            journal.fail(&e);
        }
    }

    fn compute_impact(&self, depth: Depth) -> Result<bool, SessionError> {
        let mut engine = self.engine.lock().unwrap_or_else(|p| p.into_inner());
        let found = engine.track_changes_and_tests(depth.get())?;
        if found {
            if let Some(report) = engine.impact() {
                self.ui.info("Changed methods", changed_listing(report));
                self.ui.info("Affected tests", tests_listing(report));
            }
        }
        Ok(found)
    }
}

/// Foreground task: put the working changes back, then start phase 2 unless
/// the session already failed.
fn restore_then_run_current<E: ChangeImpactEngine>(
    engine: &Mutex<E>,
    snapshots: &SnapshotCoordinator,
    ui: &ForegroundHandle,
    journal: &Journal,
    session: &RunSession,
    stashed: bool,
    failure: Option<SessionError>,
) {
    if let Err(e) = snapshots.restore_stashed_changes(stashed) {
        // Stash entry is still there; the user can apply it by hand
        ui.error(e.title(), e.to_string());
    }

    if let Some(e) = failure {
        journal.set_patterns(session.patterns());
        journal.fail(&e);
        return;
    }

    journal.enter(SessionState::Phase2Running);
    let result = engine
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .run_tests_on_current_state(session);
    journal.set_patterns(session.patterns());
    match result {
        Ok(()) => journal.enter(SessionState::Done),
        Err(e) => {
            ui.error(e.title(), e.to_string());
            journal.fail(&e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_parsing() {
        assert_eq!(Depth::parse("3").unwrap().get(), 3);
        assert_eq!(Depth::parse(" 1 ").unwrap().get(), 1);
        for bad in ["", "abc", "0", "-2", "1.5"] {
            assert!(
                matches!(Depth::parse(bad), Err(SessionError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_depth_message() {
        let err = Depth::parse("abc").unwrap_err();
        assert!(err.to_string().starts_with(crate::error::INVALID_DEPTH_MESSAGE));
        assert_eq!(err.title(), "Invalid Input");
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
        assert!(SessionState::Error.is_terminal());
        assert!(!SessionState::Restoring.is_terminal());
    }
}
