//! Run command: the two-phase test session

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use affected::config::Config;
use affected::{
    foreground, CancelToken, ChangeImpactEngine, ChangeTracker, CommandLauncher, Depth, GitCli,
    GitJavaAnalyzer, Orchestrator, SessionReport, SessionRequest, SessionState,
    SnapshotCoordinator, TestRunAdapter,
};

use crate::cli::display::{display_outcomes, display_session, TerminalNotifier};
use crate::cli::prompt;
use crate::cli::signal::{setup_signal_handler, ExitCode};

use super::notify_invalid;

/// Raw `run` inputs before validation.
pub(crate) struct RunArgs {
    pub depth: Option<String>,
    pub check_previous: bool,
}

pub(crate) fn cmd_run(root: &Path, config: &Config, args: RunArgs) -> Result<i32> {
    let _span = tracing::info_span!("cmd_run", root = %root.display()).entered();
    let notifier = TerminalNotifier;

    let request = match args.depth {
        Some(input) => match Depth::parse(&input) {
            Ok(depth) => SessionRequest {
                depth,
                check_previous: args.check_previous,
            },
            Err(e) => {
                notify_invalid(&notifier, &e);
                return Ok(ExitCode::InvalidInput as i32);
            }
        },
        None => match prompt::ask(&notifier, args.check_previous.then_some(true))? {
            Some(answers) => SessionRequest {
                depth: answers.depth,
                check_previous: answers.check_previous,
            },
            None => return Ok(ExitCode::Interrupted as i32),
        },
    };

    let filter = config.test_filter();
    let analyzer = GitJavaAnalyzer::new(root, filter.clone())?
        .with_max_call_depth(config.max_call_depth_or_default());
    let launcher = Arc::new(CommandLauncher::new(config.launch_spec()));
    let adapter = TestRunAdapter::new(root)
        .with_filter(filter)
        .with_module(config.target_module.clone(), config.module_registry(root))
        .with_max_tests(config.max_tests_or_default())
        .with_options(config.jvm_options());
    let engine = Arc::new(Mutex::new(ChangeTracker::new(analyzer, launcher, adapter)));

    let cancel = CancelToken::new();
    setup_signal_handler(cancel.clone());

    let (ui, queue) = foreground();
    let snapshots = SnapshotCoordinator::new(Arc::new(GitCli::new(root)));
    let orchestrator = Orchestrator::new(Arc::clone(&engine), snapshots, ui, cancel);
    let journal = orchestrator.journal();
    let worker = orchestrator
        .spawn(request)
        .context("Failed to start session worker")?;

    // Serve notices and the restore task until the worker and task are done
    let handled = queue.run(&notifier);
    tracing::debug!(handled, "Foreground queue drained");
    if worker.join().is_err() {
        anyhow::bail!("Session worker panicked");
    }

    let outcomes = engine
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .join_runs();
    display_outcomes(&outcomes);

    let report = journal.report();
    display_session(&report);
    Ok(exit_code(&report) as i32)
}

fn exit_code(report: &SessionReport) -> ExitCode {
    if report.interrupted {
        return ExitCode::Interrupted;
    }
    match report.final_state() {
        Some(SessionState::Error) | None => ExitCode::Failed,
        Some(_) => ExitCode::Success,
    }
}
