//! CLI implementation for affected

mod commands;
mod config;
mod display;
mod prompt;
mod signal;

pub(crate) use config::find_project_root;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use affected::config::Config;

use commands::{cmd_impact, cmd_run, RunArgs};
use config::{apply_overrides, Overrides};

#[derive(Parser)]
#[command(name = "affected")]
#[command(about = "Run the JUnit tests reached by your Java changes")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (detected from the current directory when omitted)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Show debug info (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Select and run the tests affected by changes
    Run {
        /// Commits to look back; 1 means uncommitted changes only. Prompted when omitted
        #[arg(short, long)]
        depth: Option<String>,
        /// Run the tests against the unchanged state first
        #[arg(long)]
        check_previous: bool,
        /// Only run tests of this module
        #[arg(short, long)]
        module: Option<String>,
        /// Maximum number of tests per run
        #[arg(long)]
        max_tests: Option<usize>,
        /// Reverse call-graph search depth
        #[arg(long)]
        max_call_depth: Option<usize>,
    },
    /// Show changed methods and affected tests without running anything
    Impact {
        /// Commits to look back; 1 means uncommitted changes only
        #[arg(short, long, default_value = "1")]
        depth: String,
        /// Reverse call-graph search depth
        #[arg(long)]
        max_call_depth: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Root the command works in: `--project` or the detected project root.
pub fn project_root(cli: &Cli) -> PathBuf {
    match &cli.project {
        Some(p) => p.clone(),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            find_project_root(&cwd)
        }
    }
}

/// Run CLI with pre-parsed arguments. Returns the process exit code.
pub fn run_with(cli: Cli, root: PathBuf, mut config: Config) -> Result<i32> {
    match cli.command {
        Commands::Run {
            depth,
            check_previous,
            module,
            max_tests,
            max_call_depth,
        } => {
            apply_overrides(
                &mut config,
                Overrides {
                    module,
                    max_tests,
                    max_call_depth,
                },
            );
            cmd_run(
                &root,
                &config,
                RunArgs {
                    depth,
                    check_previous,
                },
            )
        }
        Commands::Impact {
            depth,
            max_call_depth,
            json,
        } => {
            apply_overrides(
                &mut config,
                Overrides {
                    max_call_depth,
                    ..Default::default()
                },
            );
            cmd_impact(&root, &config, &depth, json)
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(signal::ExitCode::Success as i32)
        }
    }
}

/// Generate shell completion scripts for the specified shell
fn cmd_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut Cli::command(),
        "affected",
        &mut std::io::stdout(),
    );
}
