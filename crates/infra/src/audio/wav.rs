//! WAV decoding and writing
//!
//! Decoded audio is averaged down to mono and resampled to the requested
//! rate. Integer PCM is scaled to `[-1.0, 1.0)` by its bit depth.

use super::resample::Resampler;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use murmur_core::domain::audio::{AudioDecoder, DecodeError, SampleRate};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from WAV file handling
#[derive(Debug, Error)]
pub enum WavError {
    #[error("WAV error: {0}")]
    Hound(#[from] hound::Error),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid sample rate: {0} Hz")]
    InvalidRate(u32),
}

/// Decode capability backed by `hound`
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl WavDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for WavDecoder {
    fn decode(&self, path: &Path, sample_rate: SampleRate) -> Result<Vec<f32>, DecodeError> {
        let (mono, source_rate) = read_mono(path).map_err(|e| DecodeError::new(path, e))?;

        let resampler =
            Resampler::new(source_rate, sample_rate.hz()).map_err(|e| DecodeError::new(path, e))?;
        let samples = resampler.process(&mono);

        debug!(
            path = %path.display(),
            source_rate,
            target_rate = sample_rate.hz(),
            samples = samples.len(),
            "Decoded WAV file"
        );
        Ok(samples)
    }
}

/// Read a WAV file as mono samples; returns the samples and their rate
pub fn read_mono(path: &Path) -> Result<(Vec<f32>, u32), WavError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    trace!(
        "WAV spec: {}Hz, {} channels, {} bits, {:?}",
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format
    );

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(WavError::UnsupportedFormat(format!(
                    "{}-bit float",
                    spec.bits_per_sample
                )));
            }
            reader.samples::<f32>().collect::<Result<_, _>>()?
        }
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(WavError::UnsupportedFormat(format!(
                    "{}-bit integer",
                    spec.bits_per_sample
                )));
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

/// Write mono samples as a 32-bit float WAV file
pub fn write_mono(path: &Path, samples: &[f32], sample_rate: SampleRate) -> Result<(), WavError> {
    let rate = sample_rate.hz();
    if rate == 0 {
        return Err(WavError::InvalidRate(rate));
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    debug!(path = %path.display(), samples = samples.len(), "Wrote WAV file");
    Ok(())
}
