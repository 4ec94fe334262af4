//! Concrete audio collaborators for Murmur
//!
//! WAV decoding and writing backed by `hound`, plus the resampler used to
//! bring decoded files to the mixer's rate.

pub mod audio;
