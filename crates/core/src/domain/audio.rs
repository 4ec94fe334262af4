//! Audio primitives shared by the track loader and the mixer
//!
//! Decoding is an external capability reached through [`AudioDecoder`].
//! Concrete decoders live in the `infra` crate.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// Sample rate is zero
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    /// A track set was built for a different rate than the mixer runs at
    #[error("Sample rate mismatch: mixer runs at {expected} Hz, tracks are {found} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    /// Track buffer would be empty
    #[error("Track has no samples: {0}")]
    EmptyTrack(String),

    /// The audio side of the mixer has been dropped
    #[error("Mixer is no longer running")]
    MixerClosed,
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// A single file could not be turned into mono samples
#[derive(Debug, Error)]
#[error("Failed to decode {}: {reason}", .path.display())]
pub struct DecodeError {
    pub path: PathBuf,
    pub reason: String,
}

impl DecodeError {
    pub fn new(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Audio sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRate {
    Hz16000,
    Hz44100,
    Hz48000,
    Hz96000,
    Custom(u32),
}

impl SampleRate {
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
            SampleRate::Hz96000 => 96000,
            SampleRate::Custom(hz) => *hz,
        }
    }

    pub fn from_hz(hz: u32) -> Self {
        match hz {
            16000 => SampleRate::Hz16000,
            44100 => SampleRate::Hz44100,
            48000 => SampleRate::Hz48000,
            96000 => SampleRate::Hz96000,
            hz => SampleRate::Custom(hz),
        }
    }

    /// Reject rates nothing can be resampled to
    pub fn validate(self) -> Result<Self> {
        if self.hz() == 0 {
            Err(AudioError::InvalidSampleRate(0))
        } else {
            Ok(self)
        }
    }

    /// Number of samples covering `millis` milliseconds
    pub fn samples_for_millis(&self, millis: u32) -> usize {
        (u64::from(self.hz()) * u64::from(millis) / 1000) as usize
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// Decode capability used by the track loader
///
/// Implementations return mono samples at `sample_rate`, downmixing and
/// resampling as needed.
pub trait AudioDecoder: Send + Sync {
    fn decode(
        &self,
        path: &Path,
        sample_rate: SampleRate,
    ) -> std::result::Result<Vec<f32>, DecodeError>;
}
