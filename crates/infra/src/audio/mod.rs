//! File-based audio backends
//!
//! This module provides the decode capability the core track library
//! expects, implemented on top of `hound`:
//! - 8/16/24/32-bit integer and 32-bit float PCM
//! - Downmix of any channel count to mono
//! - Linear-interpolation resampling to the target rate

pub mod resample;
pub mod wav;

pub use resample::Resampler;
pub use wav::{read_mono, write_mono, WavDecoder, WavError};
