//! Sequences the model provider, the transcriber and the output sink.
//!
//! One request, one model load, one transcription, one write. Nothing is
//! retried here; failures carry their class out to the process boundary.

use std::io::Write;
use thiserror::Error;

use crate::config::{ConfigError, TranscriptionRequest};
use crate::model::{ModelLoadError, ModelProvider, TranscriptionError};
use crate::output::{self, OutputError};

/// Any failure the transcription flow can surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad input paths or names, detected before any model work.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The provider failed to produce a usable model.
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    /// The model failed to produce text from the audio.
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    /// The transcript could not be emitted.
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl PipelineError {
    /// Process exit code distinguishing the failure class.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 1,
            Self::ModelLoad(_) => 2,
            Self::Transcription(_) => 3,
            Self::Output(_) => 4,
        }
    }
}

/// Run one transcription: load the model, transcribe the audio, emit the
/// text. Both external calls are single blocking attempts.
///
/// # Errors
/// Propagates the first failing step unretried; nothing is written to the
/// sink unless transcription succeeded.
pub fn run(
    request: &TranscriptionRequest,
    provider: &dyn ModelProvider,
    sink: &mut dyn Write,
) -> Result<(), PipelineError> {
    tracing::info!(
        model = %request.model_name,
        audio = %request.audio_path.display(),
        "starting transcription run"
    );

    let model = provider.load_model(&request.model_name, &request.model_storage_root)?;
    let result = model.transcribe(&request.audio_path)?;

    for segment in &result.segments {
        tracing::debug!(
            start = segment.start,
            end = segment.end,
            text = %segment.text,
            "segment"
        );
    }

    output::write_transcript(sink, &result.text)?;
    Ok(())
}
