use super::VoiceActivity;
use crate::error::VadError;

/// Configuration for the RMS classifier
#[derive(Debug, Clone, Copy)]
pub struct EnergyVadConfig {
    /// RMS at or below which the window is considered silence (probability 0)
    pub noise_floor: f32,
    /// RMS at or above which the window is considered speech (probability 1)
    pub speech_level: f32,
    /// Minimum window length in samples
    pub min_window: usize,
}

impl Default for EnergyVadConfig {
    fn default() -> Self {
        Self {
            noise_floor: 0.005,
            speech_level: 0.05,
            min_window: 512,
        }
    }
}

/// RMS-based voice activity estimate
///
/// Maps window RMS linearly between the noise floor and the speech level.
#[derive(Debug, Clone, Default)]
pub struct EnergyVad {
    config: EnergyVadConfig,
}

impl EnergyVad {
    pub fn new(config: EnergyVadConfig) -> Self {
        Self { config }
    }
}

pub(crate) fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

impl VoiceActivity for EnergyVad {
    fn speech_probability(&mut self, window: &[f32], _sample_rate: u32) -> Result<f32, VadError> {
        if window.len() < self.config.min_window {
            return Err(VadError::WindowTooShort {
                expected: self.config.min_window,
                actual: window.len(),
            });
        }

        let level = rms(window);
        let span = (self.config.speech_level - self.config.noise_floor).max(f32::EPSILON);
        Ok(((level - self.config.noise_floor) / span).clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "energy"
    }
}
