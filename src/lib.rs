//! # affected - run the tests your change can reach
//!
//! Finds the Java methods changed since a baseline revision, walks the call
//! graph back to the JUnit tests that reach them, and runs just those tests.
//! Optionally runs them twice: first against the unchanged state (working
//! changes stashed), then against the working tree.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use affected::{
//!     foreground, CancelToken, ChangeTracker, CommandLauncher, Depth, GitCli, GitJavaAnalyzer,
//!     LaunchSpec, Orchestrator, PatternStyle, SessionRequest, SnapshotCoordinator,
//!     TestMethodFilter, TestRunAdapter,
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let root = std::path::PathBuf::from(".");
//! let analyzer = GitJavaAnalyzer::new(&root, TestMethodFilter::default())?;
//! let launcher = Arc::new(CommandLauncher::new(LaunchSpec::defaults_for(PatternStyle::Maven)));
//! let engine = Arc::new(Mutex::new(ChangeTracker::new(
//!     analyzer,
//!     launcher,
//!     TestRunAdapter::new(&root),
//! )));
//!
//! let (ui, queue) = foreground();
//! let snapshots = SnapshotCoordinator::new(Arc::new(GitCli::new(&root)));
//! let orchestrator = Orchestrator::new(engine, snapshots, ui, CancelToken::new());
//! let journal = orchestrator.journal();
//! let worker = orchestrator.spawn(SessionRequest {
//!     depth: Depth::parse("1")?,
//!     check_previous: true,
//! })?;
//! # struct Log;
//! # impl affected::Notifier for Log { fn notify(&self, n: &affected::Notice) { println!("{}", n.body) } }
//! queue.run(&Log);
//! let _ = worker.join();
//! println!("{:?}", journal.report().final_state());
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod config;
pub mod diff_parse;
pub mod error;
pub mod filter;
pub mod impact;
pub mod orchestrator;
pub mod parser;
pub mod runner;
pub mod session;
pub mod signature;
pub mod tracker;
pub mod vcs;

pub use barrier::{completion, Barrier, CancelToken, CompletionSignal, PhaseSignal, WaitError};
pub use error::SessionError;
pub use filter::{bounded_subset, Module, ModuleRegistry, TestMethodFilter};
pub use impact::{GitJavaAnalyzer, ImpactAnalyzer, ImpactReport};
pub use orchestrator::{
    foreground, Depth, ForegroundHandle, ForegroundQueue, Journal, Level, Notice, Notifier,
    Orchestrator, SessionReport, SessionRequest, SessionState,
};
pub use parser::Parser;
pub use runner::{
    CommandLauncher, LaunchSpec, PatternStyle, RunOutcome, RunRequest, RunScope, TestLauncher,
    TestRunAdapter,
};
pub use session::{RunSession, TestPattern};
pub use tracker::{ChangeImpactEngine, ChangeTracker};
pub use vcs::{GitCli, SnapshotCoordinator, Vcs, VcsError};
