//! Change tracking service: impact computation plus the two test runs
//!
//! [`ChangeImpactEngine`] is the contract the orchestrator drives.
//! [`ChangeTracker`] implements it over an [`ImpactAnalyzer`] and a
//! [`TestLauncher`].

use std::sync::Arc;

use crate::barrier::{CompletionSignal, PhaseSignal};
use crate::error::SessionError;
use crate::impact::{ImpactAnalyzer, ImpactReport};
use crate::runner::{RunHandle, RunOutcome, TestLauncher, TestRunAdapter};
use crate::session::RunSession;

/// Run configuration name for the head-state run.
pub const HEAD_RUN_NAME: &str = "AffectedTestConfigurationNoChange";
/// Run configuration name for the current-state run.
pub const CURRENT_RUN_NAME: &str = "AffectedTestConfigurationChanges";

pub trait ChangeImpactEngine: Send {
    /// Compute changed methods and impacted tests for `depth` history steps.
    /// `Ok(false)` means nothing is impacted and the session should stop.
    fn track_changes_and_tests(&mut self, depth: u32) -> Result<bool, SessionError>;

    /// Start the head-state run. `done` is released exactly once, on process
    /// termination, or immediately when the run cannot be started or has
    /// nothing to run.
    fn run_tests_on_head_files(
        &mut self,
        session: &RunSession,
        done: CompletionSignal,
    ) -> Result<(), SessionError>;

    /// Start the current-state run with the session's pattern set.
    fn run_tests_on_current_state(&mut self, session: &RunSession) -> Result<(), SessionError>;

    /// The last computed impact, if any.
    fn impact(&self) -> Option<&ImpactReport>;

    /// Wait for started runs and return their outcomes.
    fn join_runs(&mut self) -> Vec<RunOutcome> {
        Vec::new()
    }
}

/// Default engine.
pub struct ChangeTracker<A, L> {
    analyzer: A,
    launcher: Arc<L>,
    adapter: TestRunAdapter,
    report: Option<ImpactReport>,
    runs: Vec<RunHandle>,
}

impl<A: ImpactAnalyzer, L: TestLauncher + 'static> ChangeTracker<A, L> {
    pub fn new(analyzer: A, launcher: Arc<L>, adapter: TestRunAdapter) -> Self {
        Self {
            analyzer,
            launcher,
            adapter,
            report: None,
            runs: Vec::new(),
        }
    }

    /// Build and submit a run. `Ok(None)` when there is nothing to run.
    fn start_run(
        &self,
        name: &str,
        session: &RunSession,
        done: Option<CompletionSignal>,
    ) -> Result<Option<RunHandle>, SessionError> {
        let report = self.report.as_ref().ok_or_else(|| {
            SessionError::ExecutionEngineUnavailable("impact has not been computed".into())
        })?;
        let request = self
            .adapter
            .prepare(name, &report.tests, &report.hierarchy, session)?;
        if request.patterns.is_empty() {
            tracing::warn!(name, "No runnable test patterns, nothing started");
            return Ok(None);
        }

        let on_exit: crate::runner::ExitCallback = match done {
            Some(signal) => Box::new(move |outcome: &RunOutcome| {
                signal.release(PhaseSignal::Completed {
                    exit_code: outcome.exit_code,
                    success: outcome.success,
                });
            }),
            None => Box::new(|_: &RunOutcome| {}),
        };
        let handle = self
            .adapter
            .submit(self.launcher.as_ref(), &request, on_exit)?;
        Ok(Some(handle))
    }
}

impl<A: ImpactAnalyzer, L: TestLauncher + 'static> ChangeImpactEngine for ChangeTracker<A, L> {
    fn track_changes_and_tests(&mut self, depth: u32) -> Result<bool, SessionError> {
        let _span = tracing::info_span!("track_changes_and_tests", depth).entered();
        let report = self.analyzer.analyze(depth)?;
        let found = !report.is_empty();
        tracing::info!(
            changed = report.changed.len(),
            tests = report.tests.len(),
            found,
            "Change tracking finished"
        );
        self.report = Some(report);
        Ok(found)
    }

    fn run_tests_on_head_files(
        &mut self,
        session: &RunSession,
        done: CompletionSignal,
    ) -> Result<(), SessionError> {
        let _span = tracing::info_span!("run_tests_on_head_files").entered();
        match self.start_run(HEAD_RUN_NAME, session, Some(done.clone())) {
            Ok(Some(handle)) => {
                self.runs.push(handle);
                Ok(())
            }
            Ok(None) => {
                done.release(PhaseSignal::Skipped);
                Ok(())
            }
            Err(e) => {
                done.release(PhaseSignal::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn run_tests_on_current_state(&mut self, session: &RunSession) -> Result<(), SessionError> {
        let _span = tracing::info_span!("run_tests_on_current_state").entered();
        if let Some(handle) = self.start_run(CURRENT_RUN_NAME, session, None)? {
            self.runs.push(handle);
        }
        Ok(())
    }

    fn impact(&self) -> Option<&ImpactReport> {
        self.report.as_ref()
    }

    fn join_runs(&mut self) -> Vec<RunOutcome> {
        self.runs.drain(..).map(RunHandle::join).collect()
    }
}
