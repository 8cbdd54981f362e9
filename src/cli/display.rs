//! Output and display functions for CLI results

use colored::Colorize;

use affected::{Level, Notice, Notifier, RunOutcome, SessionReport, SessionState};

/// Prints notices to the terminal. Errors go to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.level {
            Level::Info => {
                println!("{}", notice.title.bold().cyan());
                println!("{}", notice.body.trim_end());
            }
            Level::Error => {
                eprintln!("{} {}", notice.title.bold().red(), notice.body.trim_end());
            }
        }
    }
}

/// One line per finished test run.
pub fn display_outcomes(outcomes: &[RunOutcome]) {
    for o in outcomes {
        let status = match (o.success, o.exit_code) {
            (true, _) => "passed".green().to_string(),
            (false, Some(code)) => format!("failed (exit {code})").red().to_string(),
            (false, None) => "terminated".yellow().to_string(),
        };
        println!(
            "{} {} {}",
            o.name.bold(),
            status,
            format!("{:.1}s", o.duration_ms as f64 / 1000.0).dimmed()
        );
    }
}

/// Final session line.
pub fn display_session(report: &SessionReport) {
    let state = report
        .final_state()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".into());
    let state = match report.final_state() {
        Some(SessionState::Done) => state.green(),
        Some(SessionState::Aborted) => state.yellow(),
        _ => state.red(),
    };
    println!(
        "Session {} ({} test patterns)",
        state,
        report.patterns.len()
    );
}
