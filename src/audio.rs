//! Decodes audio files into the 16 kHz mono f32 samples whisper.cpp
//! consumes. WAV goes through hound, compressed formats through symphonia.
//! Format support is decided by file extension, not content sniffing.

use hound::WavReader;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Sample rate whisper.cpp expects.
pub const SAMPLE_RATE: u32 = 16_000;

/// Errors raised while turning an audio file into samples.
#[derive(Debug, Error)]
pub enum AudioError {
    /// File has no extension to dispatch on.
    #[error("cannot determine audio format of {0}: no file extension")]
    UnknownFormat(std::path::PathBuf),

    /// Extension is recognized by no decoder.
    #[error("unsupported audio format: {0}")]
    Unsupported(String),

    /// The file could not be opened, parsed or decoded.
    #[error("failed to decode audio: {0}")]
    Decode(String),
}

/// Decode the file at `path` into 16 kHz mono f32 samples.
///
/// # Errors
/// Returns an error if the file is missing, corrupt or in a format no
/// decoder handles.
pub fn read_samples(path: &Path) -> Result<Vec<f32>, AudioError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .ok_or_else(|| AudioError::UnknownFormat(path.to_path_buf()))?;

    match extension.as_str() {
        "wav" => read_wav(path),
        "mp3" | "flac" | "ogg" => read_compressed(path),
        other => Err(AudioError::Unsupported(other.to_owned())),
    }
}

fn read_wav(path: &Path) -> Result<Vec<f32>, AudioError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| AudioError::Decode(format!("failed to open WAV: {e}")))?;

    let spec = reader.spec();
    tracing::debug!(
        rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "decoding wav"
    );

    let samples: Result<Vec<f32>, hound::Error> = match (spec.sample_format, spec.bits_per_sample)
    {
        (hound::SampleFormat::Float, 32) => reader.samples::<f32>().collect(),
        (hound::SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect(),
        (hound::SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect(),
        (_, bits) => {
            return Err(AudioError::Unsupported(format!("{bits}-bit WAV")));
        }
    };
    let samples =
        samples.map_err(|e| AudioError::Decode(format!("failed to read WAV samples: {e}")))?;

    let mono = downmix(samples, usize::from(spec.channels));
    Ok(resample(mono, spec.sample_rate, SAMPLE_RATE))
}

fn read_compressed(path: &Path) -> Result<Vec<f32>, AudioError> {
    let file = std::fs::File::open(path)
        .map_err(|e| AudioError::Decode(format!("failed to open file: {e}")))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("failed to probe format: {e}")))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio tracks found".to_owned()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("could not determine sample rate".to_owned()))?;
    let channels = track.codec_params.channels.map_or(0, |c| c.count());
    let codec_params = track.codec_params.clone();

    tracing::debug!(rate = sample_rate, channels, "decoding via symphonia");

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("failed to create decoder: {e}")))?;

    let mut samples = Vec::new();
    let mut sample_buf = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(AudioError::Decode(format!("failed to read packet: {e}")));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| AudioError::Decode(format!("failed to decode packet: {e}")))?;

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::<f32>::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    let mono = downmix(samples, channels);
    Ok(resample(mono, sample_rate, SAMPLE_RATE))
}

fn downmix(samples: Vec<f32>, channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear resampling; adequate for speech fed to whisper.
fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples;
    }

    tracing::debug!(from_rate, to_rate, "resampling");

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let new_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut resampled = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = (i as f64 * ratio) as usize;
        if src_idx < samples.len() {
            resampled.push(samples[src_idx]);
        }
    }

    resampled
}
