//! Command-line speech-to-text built on whisper.cpp.
//!
//! Resolves a model variant and a weight cache directory, downloads the
//! ggml weights on first use, transcribes a local audio file and prints
//! the text to stdout. One invocation is one transcription; there is no
//! daemon, no streaming and no retry logic.

/// Audio file decoding
pub mod audio;
/// Command-line argument surface
pub mod cli;
/// Settings file and request resolution
pub mod config;
/// Model loading and transcription
pub mod model;
/// Transcript output
pub mod output;
/// Orchestration of a single transcription run
pub mod pipeline;
/// Logging setup
pub mod telemetry;
