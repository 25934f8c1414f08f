//! Voice activity classification
//!
//! The session only needs a speech probability for a short trailing window.
//! Any model (Silero, WebRTC, ...) can be plugged in through [`VoiceActivity`];
//! [`EnergyVad`] is the built-in RMS classifier used when no model is configured.

mod energy;

pub use energy::{EnergyVad, EnergyVadConfig};

use crate::error::VadError;

/// Speech-probability classifier for a window of mono samples
pub trait VoiceActivity: Send {
    /// Probability in [0.0, 1.0] that `window` contains speech
    fn speech_probability(&mut self, window: &[f32], sample_rate: u32) -> Result<f32, VadError>;

    /// Classifier name for logging
    fn name(&self) -> &str;
}
