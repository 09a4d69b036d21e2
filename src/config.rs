use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::Cli;

/// Model variant used when neither flag, environment nor settings name one.
pub const DEFAULT_MODEL: &str = "turbo";

/// Weight cache location used when no override is given.
pub const DEFAULT_MODEL_DIR: &str = "~/.cache/transcribe/models";

/// Environment variable overriding the weight cache location.
pub const MODEL_DIR_ENV: &str = "TRANSCRIBE_MODEL_DIR";

/// Errors detected before any model or audio work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The audio path does not point at an existing file.
    #[error("audio file not found: {0}")]
    AudioNotFound(PathBuf),

    /// The audio file exists but cannot be opened for reading.
    #[error("audio file is not readable: {path}: {source}")]
    AudioUnreadable {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The resolved model name is empty.
    #[error("model name must not be empty")]
    EmptyModelName,

    /// The weight cache directory could not be created or accessed.
    #[error("cannot create model directory {path}: {source}")]
    StorageRoot {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The settings file exists but could not be read.
    #[error("failed to read settings file {path}: {source}")]
    SettingsRead {
        /// Settings file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The settings file is not valid TOML.
    #[error("failed to parse settings file {path}: {source}")]
    SettingsParse {
        /// Settings file path.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// A `~/`-prefixed path needed expansion but `HOME` is unset.
    #[error("HOME environment variable not set")]
    HomeNotSet,

    /// The logging subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    Logging(#[source] anyhow::Error),
}

/// Optional settings read from `~/.transcribe.toml`.
///
/// The file is never created by this tool; a missing file means defaults.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Model selection and engine knobs.
    #[serde(default)]
    pub model: ModelSettings,
    /// Logging destination.
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

/// `[model]` table of the settings file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModelSettings {
    /// Default model variant.
    pub name: Option<String>,
    /// Default weight cache directory (may start with `~/`).
    pub dir: Option<String>,
    /// Spoken language code (None = auto-detect).
    pub language: Option<String>,
    /// CPU threads for inference.
    pub threads: Option<usize>,
    /// Beam search width (1 = greedy).
    pub beam_size: Option<usize>,
}

/// `[telemetry]` table of the settings file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelemetrySettings {
    /// Append-only log file (may start with `~/`). Default is stderr.
    pub log_path: Option<String>,
}

impl Settings {
    /// Load settings from `~/.transcribe.toml`, falling back to defaults
    /// when the file (or `HOME` itself) is absent.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match env::var("HOME") {
            Ok(home) => Self::load_from(&PathBuf::from(home).join(".transcribe.toml")),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Load settings from an explicit path; a missing file means defaults.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Expand a leading `~/` to the user's home directory.
///
/// # Errors
/// Returns an error if expansion is needed but `HOME` is not set.
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(stripped) = path.strip_prefix("~/") {
        let home = env::var("HOME").map_err(|_| ConfigError::HomeNotSet)?;
        Ok(PathBuf::from(home).join(stripped))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Immutable description of a single transcription run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    /// Model variant to load.
    pub model_name: String,
    /// Directory caching downloaded weights.
    pub model_storage_root: PathBuf,
    /// Audio file to transcribe.
    pub audio_path: PathBuf,
}

impl TranscriptionRequest {
    /// Build a request from CLI arguments layered over the environment,
    /// the settings file and built-in defaults (in that precedence order;
    /// the environment override applies to the model directory only).
    ///
    /// Creates the weight cache directory if it does not exist. This is
    /// the only directory the tool ever creates.
    ///
    /// # Errors
    /// Returns an error if the audio file is missing or unreadable, the
    /// model name is empty, or the cache directory cannot be created.
    pub fn resolve(cli: &Cli, settings: &Settings) -> Result<Self, ConfigError> {
        let env_dir = env::var(MODEL_DIR_ENV).ok();
        Self::resolve_with(cli, settings, env_dir.as_deref())
    }

    fn resolve_with(
        cli: &Cli,
        settings: &Settings,
        env_model_dir: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let model_name = cli
            .model
            .clone()
            .or_else(|| settings.model.name.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned());
        if model_name.trim().is_empty() {
            return Err(ConfigError::EmptyModelName);
        }

        let audio_path = cli.audio.clone();
        if !audio_path.is_file() {
            return Err(ConfigError::AudioNotFound(audio_path));
        }
        // Probe readability now so permission problems surface as a
        // configuration error, not mid-transcription.
        fs::File::open(&audio_path).map_err(|source| ConfigError::AudioUnreadable {
            path: audio_path.clone(),
            source,
        })?;

        let model_storage_root = match &cli.model_dir {
            Some(dir) => dir.clone(),
            None => {
                let raw = env_model_dir
                    .map(str::to_owned)
                    .or_else(|| settings.model.dir.clone())
                    .unwrap_or_else(|| DEFAULT_MODEL_DIR.to_owned());
                expand_path(&raw)?
            }
        };
        fs::create_dir_all(&model_storage_root).map_err(|source| ConfigError::StorageRoot {
            path: model_storage_root.clone(),
            source,
        })?;

        Ok(Self {
            model_name,
            model_storage_root,
            audio_path,
        })
    }
}
