//! Run reports
//!
//! A JSON record of one pipeline run: what went in, which steps ran with
//! which resolved parameters, and checksums of what came out. Two runs with
//! the same input, steps and seed produce the same `samples_sha256`.

use std::fs::{self, File};
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::{AppliedStep, DegradationPipeline};
use crate::analysis::BufferStats;
use crate::engine::SampleBuffer;
use crate::error::Result;

/// A file with its checksum
#[derive(Debug, Clone, Serialize)]
pub struct FileDigest {
    pub path: PathBuf,
    pub sha256: String,
}

impl FileDigest {
    pub fn of(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            sha256: file_sha256(path)?,
        })
    }
}

/// Outcome of one `apply` run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input: FileDigest,
    pub output: Option<FileDigest>,
    pub degradations_file: Option<PathBuf>,
    pub seed: Option<u64>,
    pub backend: String,
    pub input_stats: BufferStats,
    pub output_stats: BufferStats,
    /// Checksum of the final sample data, independent of container format
    pub samples_sha256: String,
    pub steps: Vec<AppliedStep>,
    /// Error that halted the run, if any
    pub error: Option<String>,
}

impl RunReport {
    /// Start a report for `input`, measuring the freshly loaded buffer
    pub fn begin(input: &Path, loaded: &SampleBuffer) -> Result<Self> {
        let stats = BufferStats::measure(loaded);
        Ok(Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            input: FileDigest::of(input)?,
            output: None,
            degradations_file: None,
            seed: None,
            backend: String::new(),
            input_stats: stats.clone(),
            output_stats: stats,
            samples_sha256: samples_sha256(loaded),
            steps: Vec::new(),
            error: None,
        })
    }

    pub fn with_degradations_file(mut self, path: &Path) -> Self {
        self.degradations_file = Some(path.to_path_buf());
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Capture the pipeline's final state
    pub fn finish(
        &mut self,
        pipeline: &DegradationPipeline,
        output: Option<&Path>,
        error: Option<String>,
    ) -> Result<()> {
        self.finished_at = Utc::now();
        self.backend = pipeline.backend_name().to_string();
        self.output_stats = BufferStats::measure(pipeline.current());
        self.samples_sha256 = samples_sha256(pipeline.current());
        self.steps = pipeline.history().to_vec();
        self.output = output.map(FileDigest::of).transpose()?;
        self.error = error;
        Ok(())
    }

    /// Write as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// SHA-256 of a file's bytes, hex encoded
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 over sample rate, bit depth and amplitudes, hex encoded
pub fn samples_sha256(buffer: &SampleBuffer) -> String {
    let mut hasher = Sha256::new();
    hasher.update(buffer.sample_rate().to_le_bytes());
    hasher.update(buffer.bit_depth().bits().to_le_bytes());
    for &s in buffer.samples() {
        hasher.update((s as i64).to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}
