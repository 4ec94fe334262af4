//! Control-side access to a running mixer

use super::{Shared, VolumeDecibels};
use crate::domain::audio::{AudioError, Result, SampleRate};
use crate::domain::library::{LoadEvents, TrackLibrary};
use crate::domain::track::TrackSet;
use crossbeam::channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Cloneable handle for toggling the mixer and publishing track sets
///
/// Publishing never blocks the audio side: the new set is queued and the
/// mixer adopts it whole at the start of its next block. Publishes from
/// different clones are serialized, so the queued set is always the one
/// with the highest generation.
#[derive(Debug, Clone)]
pub struct MixerHandle {
    shared: Arc<Shared>,
    sample_rate: SampleRate,
    /// Held across generation assignment and send; the audio side never
    /// takes it
    publish_lock: Arc<Mutex<()>>,
    pending: Sender<TrackSet>,
    /// Same queue as `pending`, used to take back a set the mixer has not
    /// adopted before it is superseded
    superseded: Receiver<TrackSet>,
    retired: Receiver<TrackSet>,
}

impl MixerHandle {
    pub(super) fn new(
        shared: Arc<Shared>,
        sample_rate: SampleRate,
        pending: Sender<TrackSet>,
        superseded: Receiver<TrackSet>,
        retired: Receiver<TrackSet>,
    ) -> Self {
        Self {
            shared,
            sample_rate,
            publish_lock: Arc::new(Mutex::new(())),
            pending,
            superseded,
            retired,
        }
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Relaxed);
        debug!(enabled, "SFX mixing toggled");
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Relaxed)
    }

    pub fn set_master_gain(&self, volume: VolumeDecibels) {
        self.shared
            .master_gain
            .store(volume.to_amplitude().to_bits(), Ordering::Relaxed);
        debug!(db = volume.db(), "SFX master gain set");
    }

    /// Linear master gain currently applied to every track
    pub fn master_gain(&self) -> f32 {
        self.shared.master_gain()
    }

    /// Generation of the most recently published set
    pub fn published_generation(&self) -> u64 {
        self.shared.published.load(Ordering::Acquire)
    }

    /// Queue `set` to replace the live track set
    ///
    /// Returns the generation number assigned to the set. Replaced sets are
    /// freed here rather than on the audio thread.
    pub fn publish(&self, mut set: TrackSet) -> Result<u64> {
        if set.sample_rate() != self.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: self.sample_rate.hz(),
                found: set.sample_rate().hz(),
            });
        }

        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.drain_retired()?;
        let superseded = self.superseded.try_iter().count();

        let generation = self.shared.published.load(Ordering::Acquire) + 1;
        set.set_generation(generation);
        let count = set.len();

        self.pending
            .send(set)
            .map_err(|_| AudioError::MixerClosed)?;
        self.shared.published.store(generation, Ordering::Release);

        info!(
            generation,
            tracks = count,
            superseded,
            "Published SFX track set"
        );
        Ok(generation)
    }

    /// Load `library` from disk and publish the result
    ///
    /// Decoding happens entirely on the calling thread before the swap.
    pub fn reload(&self, library: &TrackLibrary, events: &dyn LoadEvents) -> Result<u64> {
        let set = library.load(events)?;
        self.publish(set)
    }

    /// Free sets the mixer has replaced; returns how many were freed
    pub fn collect_retired(&self) -> usize {
        self.retired.try_iter().count()
    }

    /// Like `collect_retired`, but fails once the mixer has been dropped
    fn drain_retired(&self) -> Result<usize> {
        let mut freed = 0;
        loop {
            match self.retired.try_recv() {
                Ok(_) => freed += 1,
                Err(TryRecvError::Empty) => return Ok(freed),
                Err(TryRecvError::Disconnected) => return Err(AudioError::MixerClosed),
            }
        }
    }
}
