use clap::Parser;
use std::path::PathBuf;

/// Transcribe a local audio file to text with a Whisper model.
#[derive(Parser, Debug, Clone)]
#[command(name = "transcribe", version)]
pub struct Cli {
    /// Audio file to transcribe (WAV, MP3, FLAC or OGG).
    pub audio: PathBuf,

    /// Model variant, e.g. "tiny", "base.en", "turbo".
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Directory where downloaded model weights are cached.
    #[arg(long, value_name = "PATH")]
    pub model_dir: Option<PathBuf>,

    /// Spoken language code, e.g. "en". Defaults to auto-detection.
    #[arg(long, value_name = "CODE")]
    pub language: Option<String>,
}
