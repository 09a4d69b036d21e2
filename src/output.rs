use std::io::Write;
use thiserror::Error;

/// Failure to emit the transcript.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The output stream rejected the write or the flush.
    #[error("failed to write transcript: {0}")]
    Write(#[from] std::io::Error),
}

/// Write `text` to `sink` untransformed, followed by a single newline,
/// then flush.
///
/// # Errors
/// Returns error if the sink is closed or unwritable.
pub fn write_transcript(sink: &mut dyn Write, text: &str) -> Result<(), OutputError> {
    writeln!(sink, "{text}")?;
    sink.flush()?;
    Ok(())
}
