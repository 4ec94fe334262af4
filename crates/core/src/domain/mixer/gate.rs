//! Voice-activity gate for background sounds
//!
//! Opens when the primary signal reaches a threshold level and closes again
//! once it has stayed below the threshold for the hold time.

use crate::domain::audio::SampleRate;

/// Gate parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSettings {
    /// RMS level of the primary block that opens the gate
    pub threshold_db: f32,
    /// How long the gate stays open after the level drops
    pub hold_ms: u32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            threshold_db: -40.0,
            hold_ms: 1300,
        }
    }
}

/// Runtime gate state, owned by the audio side
#[derive(Debug, Clone)]
pub struct ActivityGate {
    threshold: f32,
    hold_samples: usize,
    quiet_samples: usize,
    open: bool,
}

impl ActivityGate {
    pub fn new(settings: GateSettings, sample_rate: SampleRate) -> Self {
        Self {
            threshold: 10.0_f32.powf(settings.threshold_db / 20.0),
            hold_samples: sample_rate.samples_for_millis(settings.hold_ms),
            quiet_samples: 0,
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Feed one primary block and return whether the gate is open for it
    pub fn observe(&mut self, block: &[f32]) -> bool {
        if block.is_empty() {
            return self.open;
        }

        if rms(block) >= self.threshold {
            self.open = true;
            self.quiet_samples = 0;
        } else if self.open {
            self.quiet_samples = self.quiet_samples.saturating_add(block.len());
            if self.quiet_samples > self.hold_samples {
                self.open = false;
                self.quiet_samples = 0;
            }
        }

        self.open
    }
}

fn rms(block: &[f32]) -> f32 {
    let sum_sq: f32 = block.iter().map(|&s| s * s).sum();
    (sum_sq / block.len() as f32).sqrt()
}
