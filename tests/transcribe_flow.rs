//! End-to-end tests of the transcription flow against fake providers.
//!
//! These cover the externally observable contract: what reaches the
//! output sink, which exit code each failure class maps to, and that the
//! opaque collaborators are called exactly once (or not at all).

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use transcribe::cli::Cli;
use transcribe::config::{ConfigError, Settings, TranscriptionRequest};
use transcribe::model::{
    EngineOptions, ModelLoadError, ModelProvider, SpeechModel, TranscriptionError,
    TranscriptionResult, WhisperProvider,
};
use transcribe::pipeline::{self, PipelineError};

/// Model double that always yields the same text.
struct FixedModel {
    text: String,
    transcribe_calls: Arc<AtomicUsize>,
}

impl SpeechModel for FixedModel {
    fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptionResult, TranscriptionError> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TranscriptionResult {
            text: self.text.clone(),
            segments: Vec::new(),
        })
    }
}

/// Provider double handing out [`FixedModel`]s and counting loads.
struct FixedProvider {
    text: String,
    load_calls: AtomicUsize,
    transcribe_calls: Arc<AtomicUsize>,
}

impl FixedProvider {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            load_calls: AtomicUsize::new(0),
            transcribe_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ModelProvider for FixedProvider {
    fn load_model(
        &self,
        _name: &str,
        _storage_root: &Path,
    ) -> Result<Box<dyn SpeechModel>, ModelLoadError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixedModel {
            text: self.text.clone(),
            transcribe_calls: Arc::clone(&self.transcribe_calls),
        }))
    }
}

/// Provider double whose load always fails.
struct FailingProvider {
    load_calls: AtomicUsize,
    transcribe_calls: Arc<AtomicUsize>,
}

impl FailingProvider {
    fn new() -> Self {
        Self {
            load_calls: AtomicUsize::new(0),
            transcribe_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ModelProvider for FailingProvider {
    fn load_model(
        &self,
        name: &str,
        _storage_root: &Path,
    ) -> Result<Box<dyn SpeechModel>, ModelLoadError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        Err(ModelLoadError::UnknownModel(name.to_owned()))
    }
}

/// Provider double whose model fails to transcribe.
struct BrokenModelProvider;

struct BrokenModel;

impl SpeechModel for BrokenModel {
    fn transcribe(&self, _audio_path: &Path) -> Result<TranscriptionResult, TranscriptionError> {
        Err(TranscriptionError::StateCreation)
    }
}

impl ModelProvider for BrokenModelProvider {
    fn load_model(
        &self,
        _name: &str,
        _storage_root: &Path,
    ) -> Result<Box<dyn SpeechModel>, ModelLoadError> {
        Ok(Box::new(BrokenModel))
    }
}

/// Sink that fails every write, standing in for a closed stdout.
struct ClosedSink;

impl Write for ClosedSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn cli_for(audio: PathBuf, model_dir: PathBuf) -> Cli {
    Cli {
        audio,
        model: Some("turbo".to_owned()),
        model_dir: Some(model_dir),
        language: None,
    }
}

fn sample_request(dir: &tempfile::TempDir) -> TranscriptionRequest {
    let audio = dir.path().join("sample.mp3");
    std::fs::write(&audio, b"fake audio bytes").unwrap();
    let cli = cli_for(audio, dir.path().join("models"));
    TranscriptionRequest::resolve(&cli, &Settings::default()).unwrap()
}

#[test]
fn fixed_text_reaches_stdout_verbatim_with_newline() {
    let dir = tempfile::tempdir().unwrap();
    let request = sample_request(&dir);
    let provider = FixedProvider::new("hello world");

    let mut sink = Vec::new();
    pipeline::run(&request, &provider, &mut sink).unwrap();

    assert_eq!(sink, b"hello world\n");
    assert_eq!(provider.load_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_audio_fails_resolution_before_any_model_call() {
    let dir = tempfile::tempdir().unwrap();
    let cli = cli_for(dir.path().join("missing.mp3"), dir.path().join("models"));
    let provider = FixedProvider::new("never used");

    let err = TranscriptionRequest::resolve(&cli, &Settings::default()).unwrap_err();
    assert!(matches!(err, ConfigError::AudioNotFound(_)));
    assert_eq!(PipelineError::from(err).exit_code(), 1);
    assert_eq!(provider.load_calls.load(Ordering::SeqCst), 0);
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn model_load_failure_exits_2_and_never_transcribes() {
    let dir = tempfile::tempdir().unwrap();
    let request = sample_request(&dir);
    let provider = FailingProvider::new();

    let mut sink = Vec::new();
    let err = pipeline::run(&request, &provider, &mut sink).unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert_eq!(provider.load_calls.load(Ordering::SeqCst), 1);
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 0);
    assert!(sink.is_empty());
}

#[test]
fn transcription_failure_exits_3_with_empty_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let request = sample_request(&dir);

    let mut sink = Vec::new();
    let err = pipeline::run(&request, &BrokenModelProvider, &mut sink).unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(sink.is_empty());
}

#[test]
fn closed_output_stream_exits_4() {
    let dir = tempfile::tempdir().unwrap();
    let request = sample_request(&dir);
    let provider = FixedProvider::new("hello");

    let mut sink = ClosedSink;
    let err = pipeline::run(&request, &provider, &mut sink).unwrap_err();

    assert_eq!(err.exit_code(), 4);
}

#[test]
fn identical_inputs_yield_identical_output() {
    let dir = tempfile::tempdir().unwrap();
    let request = sample_request(&dir);
    let provider = FixedProvider::new("same every time");

    let mut first = Vec::new();
    pipeline::run(&request, &provider, &mut first).unwrap();

    let mut second = Vec::new();
    pipeline::run(&request, &provider, &mut second).unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.load_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn unknown_model_name_is_rejected_without_touching_the_network() {
    let dir = tempfile::tempdir().unwrap();
    let provider = WhisperProvider::new(EngineOptions::default());

    let err = provider
        .load_model("definitely-not-a-model", dir.path())
        .unwrap_err();

    assert!(matches!(err, ModelLoadError::UnknownModel(_)));
    // Nothing may be written into the cache for a rejected name.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
