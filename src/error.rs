//! Error handling for the degradation pipeline
//!
//! Every failure carries enough context (step index, step name, offending
//! parameter) to reproduce the run that produced it.

use thiserror::Error;

/// Result type alias for degradation operations
pub type Result<T> = std::result::Result<T, DegradationError>;

/// Main error type for degradation operations
#[derive(Error, Debug)]
pub enum DegradationError {
    // Configuration Errors
    #[error("Unknown degradation step: {name}")]
    UnknownStep { name: String },

    #[error("Step '{step}' is missing required parameter '{param}'")]
    MissingParameter { step: String, param: String },

    #[error("Step '{step}' has invalid parameter '{param}' = {value} (expected {expected})")]
    InvalidParameter {
        step: String,
        param: String,
        value: String,
        expected: String,
    },

    #[error("Step '{step}' has conflicting parameters: {conflict}")]
    ConflictingParameters { step: String, conflict: String },

    #[error("Invalid degradation configuration: {reason}")]
    InvalidConfig { reason: String },

    // Signal Errors
    #[error("Degenerate signal: {reason}")]
    DegenerateSignal { reason: String },

    #[error("Length mismatch: expected {expected} samples, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    // Resource Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Step '{step}' is not supported: {reason}")]
    Unsupported { step: String, reason: String },

    // Pipeline context
    #[error("Step {index} ('{name}') failed: {source}")]
    StepFailed {
        index: usize,
        name: String,
        #[source]
        source: Box<DegradationError>,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DegradationError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DegradationError::UnknownStep { .. } => "UNKNOWN_STEP",
            DegradationError::MissingParameter { .. } => "MISSING_PARAMETER",
            DegradationError::InvalidParameter { .. } => "INVALID_PARAMETER",
            DegradationError::ConflictingParameters { .. } => "CONFLICTING_PARAMETERS",
            DegradationError::InvalidConfig { .. } => "INVALID_CONFIG",
            DegradationError::DegenerateSignal { .. } => "DEGENERATE_SIGNAL",
            DegradationError::LengthMismatch { .. } => "LENGTH_MISMATCH",
            DegradationError::FileNotFound { .. } => "FILE_NOT_FOUND",
            DegradationError::InvalidAudio { .. } => "INVALID_AUDIO",
            DegradationError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            DegradationError::Unsupported { .. } => "UNSUPPORTED",
            DegradationError::StepFailed { source, .. } => source.error_code(),
            DegradationError::Io(_) => "IO_ERROR",
            DegradationError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error comes from the degradation configuration rather
    /// than from the audio being processed
    pub fn is_config_error(&self) -> bool {
        match self {
            DegradationError::UnknownStep { .. }
            | DegradationError::MissingParameter { .. }
            | DegradationError::InvalidParameter { .. }
            | DegradationError::ConflictingParameters { .. }
            | DegradationError::InvalidConfig { .. } => true,
            DegradationError::StepFailed { source, .. } => source.is_config_error(),
            _ => false,
        }
    }

    /// Check if this error is caused by an auxiliary resource (a file to mix
    /// in or an impulse response) that could not be loaded
    pub fn is_resource_error(&self) -> bool {
        match self {
            DegradationError::FileNotFound { .. }
            | DegradationError::InvalidAudio { .. }
            | DegradationError::UnsupportedFormat { .. }
            | DegradationError::Io(_) => true,
            DegradationError::StepFailed { source, .. } => source.is_resource_error(),
            _ => false,
        }
    }

    /// Wrap this error with the position and name of the step that raised it
    pub fn in_step(self, index: usize, name: &str) -> Self {
        DegradationError::StepFailed {
            index,
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// Shorthand for an invalid parameter error
    pub(crate) fn invalid_param(
        step: &str,
        param: &str,
        value: impl ToString,
        expected: &str,
    ) -> Self {
        DegradationError::InvalidParameter {
            step: step.to_string(),
            param: param.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Shorthand for a degenerate signal error
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        DegradationError::DegenerateSignal {
            reason: reason.into(),
        }
    }
}
