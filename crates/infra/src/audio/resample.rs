//! Offline sample rate conversion for decoded tracks

use super::wav::WavError;
use tracing::{debug, info};

/// Mono resampler using linear interpolation
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    ratio: f64,
}

impl Resampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, WavError> {
        if source_rate == 0 {
            return Err(WavError::InvalidRate(source_rate));
        }
        if target_rate == 0 {
            return Err(WavError::InvalidRate(target_rate));
        }

        if source_rate == target_rate {
            debug!(
                "Source and target rates match ({}Hz), bypassing resampling",
                source_rate
            );
            return Ok(Self { ratio: 1.0 });
        }

        info!("Creating resampler: {}Hz -> {}Hz", source_rate, target_rate);

        Ok(Self {
            ratio: target_rate as f64 / source_rate as f64,
        })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Resample a whole buffer
    ///
    /// The output holds `round(input.len() * ratio)` samples, and at least
    /// one when the input is non-empty.
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        if self.ratio == 1.0 || input.is_empty() {
            // Bypass - no resampling needed
            return input.to_vec();
        }

        let output_len = ((input.len() as f64 * self.ratio).round() as usize).max(1);
        let step = self.ratio.recip();
        let last = input.len() - 1;

        (0..output_len)
            .map(|frame| {
                let position = frame as f64 * step;
                let i0 = (position.floor() as usize).min(last);
                let i1 = (i0 + 1).min(last);
                let frac = (position - i0 as f64) as f32;

                input[i0] + frac * (input[i1] - input[i0])
            })
            .collect()
    }
}
