use anyhow::{anyhow, Context};
use std::path::Path;
use std::sync::{Arc, Mutex};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{
    download, ModelLoadError, ModelProvider, Segment, SpeechModel, TranscriptionError,
    TranscriptionResult,
};
use crate::audio;

/// Inference knobs for the whisper engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// CPU threads for inference.
    pub threads: usize,
    /// Beam search width; 1 selects greedy sampling.
    pub beam_size: usize,
    /// Spoken language code (None = auto-detect).
    pub language: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            beam_size: 5,
            language: None,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(4)
}

/// A whisper.cpp model loaded from a ggml weight file.
pub struct WhisperModel {
    /// Whisper context (exclusive access via the mutex)
    ctx: Arc<Mutex<WhisperContext>>,
    threads: i32,
    beam_size: i32,
    language: Option<String>,
}

impl WhisperModel {
    /// Determines sampling strategy based on beam size (pure, testable)
    const fn sampling_strategy(beam_size: i32) -> SamplingStrategy {
        if beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size,
                patience: -1.0,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        }
    }

    /// Load the model at `model_path`.
    ///
    /// # Errors
    /// Returns error if the weight file is missing or invalid, or if the
    /// knobs are zero or exceed `i32::MAX`.
    pub fn new(model_path: &Path, options: &EngineOptions) -> Result<Self, ModelLoadError> {
        let load_err = |source: anyhow::Error| ModelLoadError::Load {
            path: model_path.display().to_string(),
            source,
        };

        if options.threads == 0 {
            return Err(load_err(anyhow!("threads must be > 0")));
        }
        if options.beam_size == 0 {
            return Err(load_err(anyhow!("beam_size must be > 0")));
        }

        // whisper-rs takes i32 for both knobs.
        let threads = i32::try_from(options.threads)
            .map_err(|_| load_err(anyhow!("threads value too large (max: {})", i32::MAX)))?;
        let beam_size = i32::try_from(options.beam_size)
            .map_err(|_| load_err(anyhow!("beam_size value too large (max: {})", i32::MAX)))?;

        tracing::info!(
            path = %model_path.display(),
            threads = options.threads,
            beam_size = options.beam_size,
            language = ?options.language,
            "loading whisper model"
        );

        let path_str = model_path
            .to_str()
            .ok_or_else(|| load_err(anyhow!("model path contains invalid UTF-8")))?;

        let params = WhisperContextParameters::default();
        let ctx = WhisperContext::new_with_params(path_str, params)
            .map_err(|e| load_err(anyhow!("{e:?}")))?;

        tracing::info!("whisper model loaded");

        Ok(Self {
            ctx: Arc::new(Mutex::new(ctx)),
            threads,
            beam_size,
            language: options.language.clone(),
        })
    }

    /// Transcribes 16 kHz mono samples to text with per-segment timing.
    fn transcribe_samples(&self, samples: &[f32]) -> Result<TranscriptionResult, TranscriptionError> {
        let _span = tracing::debug_span!("transcription", samples = samples.len()).entered();

        let mut state = self
            .ctx
            .lock()
            .map_err(|e| anyhow!("mutex poisoned: {e}"))?
            .create_state()
            .map_err(|_| TranscriptionError::StateCreation)?;

        let mut params = FullParams::new(Self::sampling_strategy(self.beam_size));
        params.set_n_threads(self.threads);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_token_timestamps(true);
        params.set_language(self.language.as_deref());
        params.set_translate(false);

        let start = std::time::Instant::now();
        state
            .full(params, samples)
            .context("whisper inference failed")?;
        let inference_duration = start.elapsed();

        let mut text = String::new();
        let mut segments = Vec::new();

        for i in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(i) else {
                continue;
            };
            let segment_text = segment.to_string();
            text.push_str(&segment_text);

            // Token timestamps are in centiseconds; segment bounds are the
            // first and last valid token times.
            let mut start_s = None;
            let mut end_s = None;
            for t in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(t) else {
                    continue;
                };
                let Ok(token_text) = token.to_str() else {
                    continue;
                };
                let trimmed = token_text.trim();
                if trimmed.is_empty() || trimmed.starts_with('[') || trimmed.starts_with('<') {
                    continue;
                }
                let data = token.token_data();
                if data.t1 <= data.t0 {
                    continue;
                }
                if start_s.is_none() {
                    start_s = Some(data.t0 as f64 / 100.0);
                }
                end_s = Some(data.t1 as f64 / 100.0);
            }
            if let (Some(seg_start), Some(seg_end)) = (start_s, end_s) {
                segments.push(Segment {
                    start: seg_start,
                    end: seg_end,
                    text: segment_text.trim().to_owned(),
                });
            }
        }

        let text = text.trim().to_owned();

        tracing::info!(
            segments = segments.len(),
            text_len = text.len(),
            inference_ms = inference_duration.as_millis(),
            "transcription completed"
        );

        Ok(TranscriptionResult { text, segments })
    }
}

impl SpeechModel for WhisperModel {
    fn transcribe(&self, audio_path: &Path) -> Result<TranscriptionResult, TranscriptionError> {
        tracing::info!(path = %audio_path.display(), "transcribing");
        let samples = audio::read_samples(audio_path)?;
        self.transcribe_samples(&samples)
    }
}

// SAFETY: WhisperModel is thread-safe because:
// 1. WhisperContext is wrapped in Arc<Mutex<>>, ensuring exclusive access
// 2. All methods require acquiring the mutex lock before touching the context
// 3. No shared mutable state exists outside the mutex
#[allow(unsafe_code)]
unsafe impl Send for WhisperModel {}
#[allow(unsafe_code)]
unsafe impl Sync for WhisperModel {}

/// Production [`ModelProvider`] backed by whisper.cpp.
pub struct WhisperProvider {
    options: EngineOptions,
}

impl WhisperProvider {
    /// Create a provider that loads models with the given knobs.
    #[must_use]
    pub const fn new(options: EngineOptions) -> Self {
        Self { options }
    }
}

impl ModelProvider for WhisperProvider {
    fn load_model(
        &self,
        name: &str,
        storage_root: &Path,
    ) -> Result<Box<dyn SpeechModel>, ModelLoadError> {
        let weight_path = download::ensure_model(name, storage_root)?;
        let model = WhisperModel::new(&weight_path, &self.options)?;
        Ok(Box::new(model))
    }
}
