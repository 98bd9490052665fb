//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use walkdir::WalkDir;

use super::DegradeArgs;
use crate::analysis::BufferStats;
use crate::engine::{AudioCodec, WavCodec};
use crate::pipeline::{load_steps, DegradationPipeline, DegradationStep, RunReport, CATALOG};

/// Everything needed to degrade one file
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub steps: Vec<DegradationStep>,
    pub degradations_file: Option<PathBuf>,
    pub trim: bool,
    pub seed: Option<u64>,
    pub intermediate_dir: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

impl RunOptions {
    /// Load the degradations file named in `args`
    pub fn from_args(args: &DegradeArgs) -> Result<Self> {
        let steps = match &args.degradations {
            Some(path) => load_steps(path)
                .with_context(|| format!("loading degradations from {}", path.display()))?,
            None => {
                warn!("No degradations file given, output will only be re-encoded");
                Vec::new()
            }
        };

        Ok(Self {
            steps,
            degradations_file: args.degradations.clone(),
            trim: args.trim,
            seed: args.seed,
            ..Default::default()
        })
    }
}

/// Degrade one file.
pub fn apply(
    input: &Path,
    output: &Path,
    args: &DegradeArgs,
    keep_intermediates: Option<&Path>,
    report: Option<&Path>,
) -> Result<()> {
    let mut options = RunOptions::from_args(args)?;
    options.intermediate_dir = keep_intermediates.map(Path::to_path_buf);
    options.report = report.map(Path::to_path_buf);

    run_file(input, output, &options)?;
    println!("Wrote {}", output.display());
    Ok(())
}

/// Degrade `input` into `output` according to `options`.
pub fn run_file(input: &Path, output: &Path, options: &RunOptions) -> Result<()> {
    info!("Degrading {} -> {}", input.display(), output.display());

    let mut pipeline = DegradationPipeline::from_file(input)
        .with_context(|| format!("reading {}", input.display()))?;
    if let Some(seed) = options.seed {
        pipeline = pipeline.with_seed(seed);
    }
    if let Some(dir) = &options.intermediate_dir {
        pipeline = pipeline.with_intermediate_dir(dir);
    }
    if options.trim {
        pipeline.trim_silence()?;
    }

    let mut report = match &options.report {
        Some(_) => {
            let mut report = RunReport::begin(input, pipeline.current())?.with_seed(options.seed);
            if let Some(file) = &options.degradations_file {
                report = report.with_degradations_file(file);
            }
            Some(report)
        }
        None => None,
    };

    let outcome = pipeline.run(&options.steps);

    if let Err(e) = &outcome {
        warn!(
            "Halted after {} of {} steps; last good buffer is {} ms",
            pipeline.history().len(),
            options.steps.len(),
            pipeline.current().duration_ms()
        );
        if let (Some(report), Some(path)) = (report.as_mut(), &options.report) {
            report.finish(&pipeline, None, Some(e.to_string()))?;
            report.write(path)?;
        }
    }
    outcome.with_context(|| format!("degrading {}", input.display()))?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    pipeline
        .export(output)
        .with_context(|| format!("writing {}", output.display()))?;

    if let (Some(report), Some(path)) = (report.as_mut(), &options.report) {
        report.finish(&pipeline, Some(output), None)?;
        report
            .write(path)
            .with_context(|| format!("writing report {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}

/// Degrade every WAV file under `input_dir`.
///
/// A failing file is logged and skipped; the command fails at the end if any
/// file failed. With a seed, file `i` (in sorted order) uses `seed + i`.
pub fn batch(
    input_dir: &Path,
    output_dir: &Path,
    args: &DegradeArgs,
    report_dir: Option<&Path>,
) -> Result<()> {
    let base = RunOptions::from_args(args)?;
    let inputs = find_wav_files(input_dir)?;
    if inputs.is_empty() {
        bail!("no .wav files found under {}", input_dir.display());
    }
    info!("Found {} files under {}", inputs.len(), input_dir.display());

    let mut failures = 0usize;
    for (i, input) in inputs.iter().enumerate() {
        let relative = input.strip_prefix(input_dir).unwrap_or(input);
        let output = output_dir.join(relative);

        let mut options = base.clone();
        options.seed = base.seed.map(|s| s.wrapping_add(i as u64));
        options.report =
            report_dir.map(|dir| dir.join(relative).with_extension("json"));

        match run_file(input, &output, &options) {
            Ok(()) => println!("[{}/{}] {}", i + 1, inputs.len(), output.display()),
            Err(e) => {
                warn!("{}: {:#}", input.display(), e);
                failures += 1;
            }
        }
    }

    println!(
        "Processed {} files, {} failed",
        inputs.len(),
        failures
    );
    if failures > 0 {
        bail!("{} of {} files failed", failures, inputs.len());
    }
    Ok(())
}

/// Sorted list of `.wav` files under `dir`
pub fn find_wav_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("scanning {}", dir.display()))?;
        let is_wav = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if entry.file_type().is_file() && is_wav {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// List available degradations.
pub fn effects(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(CATALOG)?);
        return Ok(());
    }

    for info in CATALOG {
        println!("{:<27} {}", info.name, info.description);
        for (param, default) in info.params {
            println!("    {:<20} {}", param, default);
        }
    }
    Ok(())
}

/// Print statistics of an audio file.
pub fn inspect(path: &Path, json: bool) -> Result<()> {
    info!("Inspecting {}", path.display());

    let buffer = WavCodec
        .decode(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let stats = BufferStats::measure(&buffer);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("File:        {}", path.display());
    println!("Sample rate: {} Hz", stats.sample_rate);
    println!("Bit depth:   {}", stats.bit_depth);
    println!("Samples:     {}", stats.num_samples);
    println!("Duration:    {} ms", stats.duration_ms);
    println!("Mean:        {:.3}", stats.mean);
    println!("RMS:         {:.2} dBFS", stats.rms_dbfs);
    println!("Peak:        {:.2} dBFS", stats.peak_dbfs);
    Ok(())
}
