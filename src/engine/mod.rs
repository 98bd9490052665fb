//! Audio Engine Module
//!
//! Core buffer type and file I/O:
//! - Immutable mono sample buffers
//! - WAV decoding/encoding behind the `AudioCodec` collaborator trait

pub mod buffer;
pub mod io;

pub use buffer::{db_to_linear, linear_to_db, BitDepth, SampleBuffer};
pub use io::{
    export_audio, generate_harmonic_tone, generate_test_tone, import_audio, AudioCodec, WavCodec,
};
