//! Impact command: what the tracked changes reach, without running tests

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use affected::config::Config;
use affected::impact::{changed_listing, report_to_json, tests_listing};
use affected::{Depth, GitJavaAnalyzer, ImpactAnalyzer, ImpactReport};

use crate::cli::display::TerminalNotifier;
use crate::cli::signal::ExitCode;

use super::notify_invalid;

pub(crate) fn cmd_impact(root: &Path, config: &Config, depth: &str, json: bool) -> Result<i32> {
    let _span = tracing::info_span!("cmd_impact", depth).entered();

    let depth = match Depth::parse(depth) {
        Ok(d) => d,
        Err(e) => {
            notify_invalid(&TerminalNotifier, &e);
            return Ok(ExitCode::InvalidInput as i32);
        }
    };

    let analyzer = GitJavaAnalyzer::new(root, config.test_filter())?
        .with_max_call_depth(config.max_call_depth_or_default());
    let report = analyzer.analyze(depth.get())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report_to_json(&report, root))?
        );
    } else {
        display_impact_text(&report);
    }
    Ok(ExitCode::Success as i32)
}

/// Terminal display with colored output
fn display_impact_text(report: &ImpactReport) {
    println!(
        "{} {} ({} files scanned)",
        "Baseline".bold(),
        report.baseline,
        report.files_scanned
    );

    if report.changed.is_empty() {
        println!();
        println!("{}", "No changed methods.".dimmed());
        return;
    }
    println!();
    println!("{} ({}):", "Changed methods".cyan(), report.changed.len());
    print!("{}", changed_listing(report));

    println!();
    if report.tests.is_empty() {
        println!("{}", "No affected tests found.".dimmed());
    } else {
        println!("{} ({}):", "Affected tests".cyan(), report.tests.len());
        print!("{}", tests_listing(report));
    }
}
