//! Looping sample buffers and the sets the mixer plays from
//!
//! An [`AudioTrack`] is one full loop cycle of mono audio plus a read cursor.
//! Sample storage is reference counted and never mutated after load, so a
//! reloaded [`TrackSet`] can be handed across threads without copying.

use crate::domain::audio::{AudioError, Result, SampleRate};
use std::fmt;
use std::sync::Arc;

/// Track identity, normally the source file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One looping background sound
#[derive(Debug, Clone)]
pub struct AudioTrack {
    id: TrackId,
    samples: Arc<[f32]>,
    /// Index of the next unread sample, always `< samples.len()`
    cursor: usize,
    /// Linear gain applied to this track's contribution
    gain: f32,
}

impl AudioTrack {
    /// Create a track at unity gain with its cursor at the loop start
    pub fn new(id: TrackId, samples: Vec<f32>) -> Result<Self> {
        if samples.is_empty() {
            return Err(AudioError::EmptyTrack(id.0));
        }

        Ok(Self {
            id,
            samples: samples.into(),
            cursor: 0,
            gain: 1.0,
        })
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain.max(0.0);
        self
    }

    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// True when both tracks read from the same sample storage
    pub fn shares_samples_with(&self, other: &AudioTrack) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }

    /// Add the next `out.len()` samples, scaled by `gain`, into `out`
    ///
    /// Reading past the end continues from the loop start, as many times as
    /// the block length requires. The cursor ends at
    /// `(cursor + out.len()) % len`.
    pub fn mix_into(&mut self, out: &mut [f32], gain: f32) {
        let len = self.samples.len();
        if len == 0 {
            return;
        }

        let mut pos = self.cursor;
        let mut written = 0;

        while written < out.len() {
            let run = (len - pos).min(out.len() - written);
            let segment = &self.samples[pos..pos + run];

            out[written..written + run]
                .iter_mut()
                .zip(segment)
                .for_each(|(out, sample)| *out += sample * gain);

            written += run;
            pos += run;
            if pos == len {
                pos = 0;
            }
        }

        self.cursor = pos;
    }

    /// Advance the cursor by `frames` without contributing audio
    pub fn advance(&mut self, frames: usize) {
        let len = self.samples.len();
        if len == 0 {
            return;
        }
        self.cursor = (self.cursor + frames % len) % len;
    }
}

/// Complete set of tracks mixed together at one sample rate
///
/// Sets are replaced wholesale on reload; the mixer never sees a partially
/// updated set.
#[derive(Debug, Clone)]
pub struct TrackSet {
    tracks: Vec<AudioTrack>,
    sample_rate: SampleRate,
    generation: u64,
}

impl TrackSet {
    pub fn new(sample_rate: SampleRate, tracks: Vec<AudioTrack>) -> Self {
        Self {
            tracks,
            sample_rate,
            generation: 0,
        }
    }

    pub fn empty(sample_rate: SampleRate) -> Self {
        Self::new(sample_rate, Vec::new())
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Publication counter assigned by the mixer handle (0 = initial set)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks in mixing order
    pub fn iter(&self) -> impl Iterator<Item = &AudioTrack> {
        self.tracks.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut AudioTrack> {
        self.tracks.iter_mut()
    }

    pub fn get(&self, id: &TrackId) -> Option<&AudioTrack> {
        self.tracks.iter().find(|track| track.id() == id)
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(|track| track.id().clone()).collect()
    }
}
