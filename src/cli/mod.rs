//! CLI Module
//!
//! Command-line interface for the degradation toolbox.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Apply controlled, reproducible degradations to audio recordings
#[derive(Parser, Debug)]
#[command(name = "audio-degradation")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by `apply` and `batch`
#[derive(clap::Args, Debug, Clone)]
pub struct DegradeArgs {
    /// JSON file of degradations to apply, in order
    #[arg(short, long = "degradations-file")]
    pub degradations: Option<PathBuf>,

    /// Trim leading and trailing silence before degrading
    #[arg(short, long)]
    pub trim: bool,

    /// Seed for noise generation; runs with the same seed are identical
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Degrade one file
    #[command(name = "apply")]
    Apply {
        /// Input audio file
        input: PathBuf,

        /// Output WAV file
        output: PathBuf,

        #[command(flatten)]
        degrade: DegradeArgs,

        /// Write each step's output into this directory
        #[arg(long, value_name = "DIR")]
        keep_intermediates: Option<PathBuf>,

        /// Write a JSON run report
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// Degrade every WAV file under a directory
    #[command(name = "batch")]
    Batch {
        /// Directory searched recursively for .wav files
        input_dir: PathBuf,

        /// Directory receiving degraded files, mirroring the input layout
        output_dir: PathBuf,

        #[command(flatten)]
        degrade: DegradeArgs,

        /// Write one JSON run report per file into this directory
        #[arg(long, value_name = "DIR")]
        report_dir: Option<PathBuf>,
    },

    /// List available degradations and their defaults
    #[command(name = "effects")]
    Effects {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print statistics of an audio file
    #[command(name = "inspect")]
    Inspect {
        /// Audio file
        path: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}
