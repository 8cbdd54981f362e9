//! Common test fixtures and helpers
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::{two_test_report, Harness};
//! ```
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use affected::impact::{ChangeKind, ChangeRecord, TestMethod};
use affected::runner::{ExitCallback, LaunchError, RunHandle};
use affected::{
    foreground, CancelToken, ChangeImpactEngine, ChangeTracker, Depth, ImpactAnalyzer, ImpactReport,
    Notice, Notifier, Orchestrator, RunOutcome, RunRequest, SessionReport, SessionRequest,
    SnapshotCoordinator, TestLauncher, TestRunAdapter, Vcs, VcsError,
};

/// Ordered record of side effects across fakes.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// In-memory VCS recording stash and apply calls.
pub struct FakeVcs {
    pub log: EventLog,
    /// What `stash_push` reports: `true` means an entry was created
    pub has_changes: bool,
    pub fail_stash: bool,
    pub fail_apply: bool,
}

impl FakeVcs {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            has_changes: true,
            fail_stash: false,
            fail_apply: false,
        }
    }
}

fn git_failure(command: &str) -> VcsError {
    VcsError::Failed {
        command: command.to_string(),
        stderr: "simulated failure".to_string(),
    }
}

impl Vcs for FakeVcs {
    fn stash_push(&self, _message: &str) -> Result<bool, VcsError> {
        if self.fail_stash {
            return Err(git_failure("stash push"));
        }
        self.log.push("stash");
        Ok(self.has_changes)
    }

    fn stash_apply_top(&self) -> Result<(), VcsError> {
        if self.fail_apply {
            return Err(git_failure("stash apply"));
        }
        self.log.push("apply");
        Ok(())
    }
}

/// Analyzer returning a fixed report.
pub struct FakeAnalyzer {
    pub report: ImpactReport,
    pub fail: bool,
    pub depths: Arc<Mutex<Vec<u32>>>,
}

impl FakeAnalyzer {
    pub fn new(report: ImpactReport) -> Self {
        Self {
            report,
            fail: false,
            depths: Arc::default(),
        }
    }
}

impl ImpactAnalyzer for FakeAnalyzer {
    fn analyze(&self, depth: u32) -> anyhow::Result<ImpactReport> {
        self.depths.lock().unwrap().push(depth);
        if self.fail {
            anyhow::bail!("simulated analysis failure");
        }
        Ok(self.report.clone())
    }
}

/// How a [`FakeLauncher`] behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchMode {
    /// Run for the given delay, then exit with code 0
    Succeed,
    /// Refuse to start
    Refuse,
    /// Start, but never report termination
    DropCallback,
}

/// Launcher that pretends to run tests on a background thread.
pub struct FakeLauncher {
    pub log: EventLog,
    pub requests: Mutex<Vec<RunRequest>>,
    pub delay: Duration,
    pub mode: LaunchMode,
}

impl FakeLauncher {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            requests: Mutex::new(Vec::new()),
            delay: Duration::from_millis(20),
            mode: LaunchMode::Succeed,
        }
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TestLauncher for FakeLauncher {
    fn launch(&self, request: &RunRequest, on_exit: ExitCallback) -> Result<RunHandle, LaunchError> {
        if self.mode == LaunchMode::Refuse {
            return Err(LaunchError::EmptyCommand);
        }
        self.requests.lock().unwrap().push(request.clone());
        self.log.push(format!("launch:{}", request.name));

        let outcome = RunOutcome {
            name: request.name.clone(),
            exit_code: Some(0),
            success: true,
            duration_ms: self.delay.as_millis() as u64,
        };
        if self.mode == LaunchMode::DropCallback {
            drop(on_exit);
            return Ok(RunHandle::finished(outcome));
        }

        let log = self.log.clone();
        let delay = self.delay;
        let watcher = std::thread::spawn(move || {
            std::thread::sleep(delay);
            log.push(format!("exit:{}", outcome.name));
            on_exit(&outcome);
            outcome
        });
        Ok(RunHandle::spawned(request.name.clone(), watcher))
    }
}

/// Notifier that keeps every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect()
    }

    pub fn body_of(&self, title: &str) -> Option<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.title == title)
            .map(|n| n.body.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// A JUnit 4 test method under `/p/<module>/src/test/java`.
pub fn test_method(module: &str, class: &str, method: &str) -> TestMethod {
    let simple = class.rsplit('.').next().unwrap_or(class);
    TestMethod {
        signature: format!("{class}.{method}()"),
        class_name: Some(class.to_string()),
        method_name: method.to_string(),
        parameter_types: Vec::new(),
        annotations: vec!["org.junit.Test".to_string()],
        file: PathBuf::from(format!("/p/{module}/src/test/java/{simple}.java")),
        line: 10,
        depth: 1,
    }
}

/// A modified production method.
pub fn changed(class: &str, method: &str) -> ChangeRecord {
    ChangeRecord {
        signature: format!("{class}.{method}()"),
        class_qualified_name: class.to_string(),
        method_name: method.to_string(),
        parameter_types: Vec::new(),
        file: format!("src/main/java/{}.java", class.replace('.', "/")),
        kind: ChangeKind::Modified,
    }
}

/// One changed method reached by two tests.
pub fn two_test_report() -> ImpactReport {
    ImpactReport {
        baseline: "HEAD".to_string(),
        changed: vec![changed("shop.Cart", "total")],
        tests: vec![
            test_method("core", "shop.CartTest", "totalsItems"),
            test_method("core", "shop.CheckoutTest", "chargesTotal"),
        ],
        files_scanned: 4,
        ..Default::default()
    }
}

/// Everything a session touched.
pub struct Finished {
    pub report: SessionReport,
    pub runs: Vec<RunOutcome>,
    pub log: EventLog,
    pub launcher: Arc<FakeLauncher>,
    pub notifier: RecordingNotifier,
    /// Depths the analyzer was called with
    pub depths: Vec<u32>,
}

/// Wires fakes into a real orchestrator.
pub struct Harness {
    pub log: EventLog,
    pub vcs: FakeVcs,
    pub analyzer: FakeAnalyzer,
    pub launcher: Arc<FakeLauncher>,
    pub adapter: TestRunAdapter,
    pub cancel: CancelToken,
}

impl Harness {
    pub fn new(report: ImpactReport) -> Self {
        let log = EventLog::default();
        Self {
            vcs: FakeVcs::new(log.clone()),
            analyzer: FakeAnalyzer::new(report),
            launcher: Arc::new(FakeLauncher::new(log.clone())),
            adapter: TestRunAdapter::new("/p"),
            cancel: CancelToken::new(),
            log,
        }
    }

    /// Replace the launcher, keeping the shared log.
    pub fn with_launcher(mut self, delay: Duration, mode: LaunchMode) -> Self {
        self.launcher = Arc::new(FakeLauncher {
            log: self.log.clone(),
            requests: Mutex::new(Vec::new()),
            delay,
            mode,
        });
        self
    }

    /// Run one session to completion on a worker thread, serving the
    /// foreground queue on this thread.
    pub fn run(self, depth: u32, check_previous: bool) -> Finished {
        let depths = Arc::clone(&self.analyzer.depths);
        let engine = Arc::new(Mutex::new(ChangeTracker::new(
            self.analyzer,
            Arc::clone(&self.launcher),
            self.adapter,
        )));
        let (ui, queue) = foreground();
        let snapshots = SnapshotCoordinator::new(Arc::new(self.vcs));
        let orchestrator = Orchestrator::new(Arc::clone(&engine), snapshots, ui, self.cancel);
        let journal = orchestrator.journal();
        let worker = orchestrator
            .spawn(SessionRequest {
                depth: Depth::parse(&depth.to_string()).unwrap(),
                check_previous,
            })
            .unwrap();

        let notifier = RecordingNotifier::default();
        queue.run(&notifier);
        worker.join().unwrap();
        let runs = engine.lock().unwrap().join_runs();
        let depths = depths.lock().unwrap().clone();

        Finished {
            report: journal.report(),
            runs,
            log: self.log,
            launcher: self.launcher,
            notifier,
            depths,
        }
    }
}
