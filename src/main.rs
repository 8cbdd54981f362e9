use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let root = cli::project_root(&cli);
    let config = affected::config::Config::load(&root);

    // Log to stderr to keep stdout clean for --json output
    let verbose = cli.verbose || config.verbose_or_default();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let code = cli::run_with(cli, root, config)?;
    std::process::exit(code);
}
