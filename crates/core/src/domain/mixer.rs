//! Streaming background-sound mixer
//!
//! This module provides the audio-side [`SfxMixer`], which overlays every
//! loaded track onto the primary stream block by block, and the control-side
//! [`MixerHandle`] used to toggle it and publish reloaded track sets.
//!
//! Summation order is fixed: the primary block first, then each track in
//! [`TrackSet`] order. The result is hard-clipped to `[-1.0, 1.0]`.

mod gate;
mod handle;

pub use gate::{ActivityGate, GateSettings};
pub use handle::MixerHandle;

use crate::domain::audio::{AudioError, Result, SampleRate};
use crate::domain::track::TrackSet;
use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Published sets the mixer has not adopted yet
const PENDING_CAPACITY: usize = 1;

/// Replaced sets waiting to be freed on the control thread
///
/// `publish` drains this queue before every send, so at most
/// `PENDING_CAPACITY + 1` sets are ever waiting in it.
const RETIRE_CAPACITY: usize = 4;

/// Volume level in decibels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeDecibels(f32);

impl VolumeDecibels {
    pub const MIN_GAIN: f32 = -60.0; // -60 dB (effectively silent)
    pub const UNITY_GAIN: f32 = 0.0; // 0 dB (no change)
    pub const MAX_GAIN: f32 = 6.0; // +6 dB (200% amplitude)

    pub fn new(db: f32) -> Self {
        Self(db.clamp(Self::MIN_GAIN, Self::MAX_GAIN))
    }

    pub fn unity() -> Self {
        Self(Self::UNITY_GAIN)
    }

    pub fn db(&self) -> f32 {
        self.0
    }

    /// Convert decibels to linear amplitude factor
    pub fn to_amplitude(&self) -> f32 {
        if self.0 <= Self::MIN_GAIN {
            0.0
        } else if self.0 == Self::UNITY_GAIN {
            1.0
        } else {
            10.0_f32.powf(self.0 / 20.0)
        }
    }

    /// Create from linear amplitude factor
    pub fn from_amplitude(amp: f32) -> Self {
        let db = if amp <= 0.0 {
            Self::MIN_GAIN
        } else {
            20.0 * amp.log10()
        };
        Self::new(db)
    }
}

impl Default for VolumeDecibels {
    fn default() -> Self {
        Self::unity()
    }
}

/// Per-track playback settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackSettings {
    pub volume: VolumeDecibels,
    pub muted: bool,
}

impl TrackSettings {
    /// Linear gain for this track (0 when muted)
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume.to_amplitude()
        }
    }
}

/// Static mixer parameters
#[derive(Debug, Clone)]
pub struct MixerSettings {
    pub enabled: bool,
    pub sample_rate: SampleRate,
    /// Expected block length; sizes the reusable output buffer
    pub block_size: usize,
    pub master_gain: VolumeDecibels,
    pub gate: Option<GateSettings>,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: SampleRate::Hz48000,
            block_size: 512,
            master_gain: VolumeDecibels::unity(),
            gate: None,
        }
    }
}

/// State shared between the audio side and control side
#[derive(Debug)]
struct Shared {
    enabled: AtomicBool,
    /// f32 bits of the linear master gain
    master_gain: AtomicU32,
    published: AtomicU64,
}

impl Shared {
    fn master_gain(&self) -> f32 {
        f32::from_bits(self.master_gain.load(Ordering::Relaxed))
    }
}

/// Create a connected mixer pair playing `initial`
///
/// The [`SfxMixer`] belongs on the audio thread; the [`MixerHandle`] can be
/// cloned and used from any other thread.
pub fn channel(settings: MixerSettings, initial: TrackSet) -> Result<(MixerHandle, SfxMixer)> {
    let sample_rate = settings.sample_rate.validate()?;
    if initial.sample_rate() != sample_rate {
        return Err(AudioError::SampleRateMismatch {
            expected: sample_rate.hz(),
            found: initial.sample_rate().hz(),
        });
    }

    let shared = Arc::new(Shared {
        enabled: AtomicBool::new(settings.enabled),
        master_gain: AtomicU32::new(settings.master_gain.to_amplitude().to_bits()),
        published: AtomicU64::new(initial.generation()),
    });

    let (pending_tx, pending_rx) = bounded(PENDING_CAPACITY);
    let (retired_tx, retired_rx) = bounded(RETIRE_CAPACITY);

    let gate = settings
        .gate
        .map(|gate| ActivityGate::new(gate, sample_rate));

    debug!(
        sample_rate = sample_rate.hz(),
        block_size = settings.block_size,
        tracks = initial.len(),
        gated = gate.is_some(),
        "Creating SFX mixer"
    );

    let handle = MixerHandle::new(
        shared.clone(),
        sample_rate,
        pending_tx,
        pending_rx.clone(),
        retired_rx,
    );
    let mixer = SfxMixer {
        tracks: initial,
        scratch: Vec::with_capacity(settings.block_size),
        gate,
        shared,
        pending: pending_rx,
        retired: retired_tx,
        parked: Vec::with_capacity(RETIRE_CAPACITY),
    };

    Ok((handle, mixer))
}

/// Audio-side mixer
///
/// Owns the live track set and every cursor in it. `mix` and `process`
/// perform no I/O and take no locks; the only allocation is growth of the
/// reusable output buffer when a block exceeds every previous one.
pub struct SfxMixer {
    tracks: TrackSet,
    scratch: Vec<f32>,
    gate: Option<ActivityGate>,
    shared: Arc<Shared>,
    pending: Receiver<TrackSet>,
    retired: Sender<TrackSet>,
    /// Replaced sets the retire queue could not take; never grows past its
    /// initial capacity
    parked: Vec<TrackSet>,
}

impl SfxMixer {
    /// Mix into a copy of `primary` and return it
    ///
    /// The returned slice has the same length as `primary` and stays valid
    /// until the next call.
    pub fn mix(&mut self, primary: &[f32]) -> &[f32] {
        let mut block = std::mem::take(&mut self.scratch);
        block.clear();
        block.extend_from_slice(primary);

        self.process(&mut block);

        self.scratch = block;
        &self.scratch
    }

    /// Mix in place over `block`
    pub fn process(&mut self, block: &mut [f32]) {
        self.adopt_pending();

        if !self.shared.enabled.load(Ordering::Relaxed) || self.tracks.is_empty() {
            return;
        }

        // Gate decisions look at the primary signal only
        let audible = match self.gate.as_mut() {
            Some(gate) => gate.observe(block),
            None => true,
        };
        let master = if audible { self.shared.master_gain() } else { 0.0 };

        for track in self.tracks.iter_mut() {
            let gain = master * track.gain();
            if gain == 0.0 {
                track.advance(block.len());
            } else {
                track.mix_into(block, gain);
            }
        }

        for sample in block.iter_mut() {
            *sample = if sample.is_nan() {
                0.0
            } else {
                sample.clamp(-1.0, 1.0)
            };
        }
    }

    /// Track set currently being played
    pub fn tracks(&self) -> &TrackSet {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Generation of the live track set
    pub fn generation(&self) -> u64 {
        self.tracks.generation()
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Relaxed)
    }

    /// Swap in the newest published set, if any
    fn adopt_pending(&mut self) {
        self.flush_parked();

        let mut latest = None;
        while let Ok(set) = self.pending.try_recv() {
            if let Some(stale) = latest.replace(set) {
                self.retire(stale);
            }
        }

        if let Some(set) = latest {
            let old = std::mem::replace(&mut self.tracks, set);
            self.retire(old);
        }
    }

    fn retire(&mut self, set: TrackSet) {
        if let Err(e) = self.retired.try_send(set) {
            let set = e.into_inner();
            if self.parked.len() < self.parked.capacity() {
                self.parked.push(set);
            } else {
                // Not reached: publish keeps the queue below capacity
                drop(set);
            }
        }
    }

    fn flush_parked(&mut self) {
        while let Some(set) = self.parked.pop() {
            if let Err(e) = self.retired.try_send(set) {
                self.parked.push(e.into_inner());
                break;
            }
        }
    }
}
