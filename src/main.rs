//! Audio degradation CLI
//!
//! Command-line interface for the audio degradation toolbox.

use anyhow::Result;
use clap::Parser;
use log::debug;
use tracing_subscriber::EnvFilter;

use audio_degradation::cli::commands;
use audio_degradation::cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!("audio-degradation v{}", env!("CARGO_PKG_VERSION"));

    handle_command(cli.command)
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Apply {
            input,
            output,
            degrade,
            keep_intermediates,
            report,
        } => commands::apply(
            &input,
            &output,
            &degrade,
            keep_intermediates.as_deref(),
            report.as_deref(),
        ),
        Commands::Batch {
            input_dir,
            output_dir,
            degrade,
            report_dir,
        } => commands::batch(&input_dir, &output_dir, &degrade, report_dir.as_deref()),
        Commands::Effects { json } => commands::effects(json),
        Commands::Inspect { path, json } => commands::inspect(&path, json),
    }
}
