//! Model loading and transcription.
//!
//! The orchestrator sees two seams: [`ModelProvider`] turns a variant
//! name and a cache directory into a loaded model, and [`SpeechModel`]
//! turns an audio file into a [`TranscriptionResult`]. The production
//! implementations live in [`engine`]; tests substitute doubles.

/// Model weight download and cache management
pub mod download;
/// whisper.cpp-backed engine
pub mod engine;

pub use engine::{EngineOptions, WhisperModel, WhisperProvider};

use std::path::Path;
use thiserror::Error;

use crate::audio::AudioError;

/// A timed span of transcribed speech.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds.
    pub end: f64,
    /// Text spoken within the span.
    pub text: String,
}

/// Everything the model produced for one audio file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscriptionResult {
    /// Full transcript, whitespace-trimmed.
    pub text: String,
    /// Per-segment breakdown, ordered by start time.
    pub segments: Vec<Segment>,
}

/// Errors raised while producing a usable model.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// The name is not one of the published variants.
    #[error("unknown model: {0:?}")]
    UnknownModel(String),

    /// Fetching the weights failed.
    #[error("failed to download model {name}: {source}")]
    Download {
        /// Requested variant.
        name: String,
        /// Underlying error.
        source: anyhow::Error,
    },

    /// The weight file exists but could not be loaded.
    #[error("failed to load whisper model from {path}: {source}")]
    Load {
        /// Path to the weight file.
        path: String,
        /// Underlying error.
        source: anyhow::Error,
    },
}

/// Errors raised while turning audio into text.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The audio file could not be decoded into samples.
    #[error("failed to read audio: {0}")]
    Audio(#[from] AudioError),

    /// Failed to create whisper inference state.
    #[error("failed to create whisper state")]
    StateCreation,

    /// Inference itself failed.
    #[error("failed to transcribe audio")]
    Inference(#[from] anyhow::Error),
}

/// A loaded speech-to-text model.
///
/// The only capability the orchestrator relies on; production code uses
/// the whisper-backed [`WhisperModel`], tests a double.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechModel: Send + Sync {
    /// Transcribe the audio file at `audio_path`.
    ///
    /// A single blocking attempt; whatever the engine returns — text,
    /// garbled or empty — is passed through uninterpreted.
    ///
    /// # Errors
    /// Returns error if the file cannot be decoded or inference fails.
    fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionResult, TranscriptionError>;
}

/// Produces loaded models from a variant name and a weight cache directory.
#[cfg_attr(test, mockall::automock)]
pub trait ModelProvider {
    /// Load the named model, fetching its weights first if needed.
    ///
    /// A single blocking attempt; any retry policy belongs to the caller's
    /// environment, not here.
    ///
    /// # Errors
    /// Returns error if the name is unknown, the download fails or the
    /// weights cannot be loaded.
    fn load_model(
        &self,
        name: &str,
        storage_root: &Path,
    ) -> Result<Box<dyn SpeechModel>, ModelLoadError>;
}
