//! Binary entry point: parse arguments, resolve the request, run the
//! pipeline, map failures to exit codes.

use std::io;
use std::process::ExitCode;

use clap::Parser;

use transcribe::cli::Cli;
use transcribe::config::{ConfigError, Settings, TranscriptionRequest};
use transcribe::model::{EngineOptions, WhisperProvider};
use transcribe::pipeline::{self, PipelineError};
use transcribe::telemetry;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<(), PipelineError> {
    let settings = Settings::load()?;
    telemetry::init(settings.telemetry.log_path.as_deref()).map_err(ConfigError::Logging)?;

    let request = TranscriptionRequest::resolve(cli, &settings)?;

    let mut options = EngineOptions::default();
    if let Some(threads) = settings.model.threads {
        options.threads = threads;
    }
    if let Some(beam_size) = settings.model.beam_size {
        options.beam_size = beam_size;
    }
    options.language = cli
        .language
        .clone()
        .or_else(|| settings.model.language.clone());

    let provider = WhisperProvider::new(options);
    let mut stdout = io::stdout().lock();
    pipeline::run(&request, &provider, &mut stdout)
}
