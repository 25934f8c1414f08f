//! Error types for audio capture and voice-activity classification.

use thiserror::Error;

/// Failures reported by an [`AudioFrameSource`](crate::audio::AudioFrameSource).
///
/// End of stream is not an error: sources report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Audio device not found: {device}")]
    DeviceUnavailable { device: String },

    #[error("Unsupported audio format: {message}")]
    UnsupportedFormat { message: String },

    #[error("Audio stream failed: {message}")]
    Stream { message: String },

    #[error("Audio source '{source_name}' has not been started")]
    NotStarted { source_name: String },

    #[error("Replay audio unavailable: {message}")]
    Replay { message: String },
}

/// Failures reported by a [`VoiceActivity`](crate::vad::VoiceActivity) classifier.
#[derive(Error, Debug)]
pub enum VadError {
    #[error("VAD window too short: expected {expected} samples, got {actual}")]
    WindowTooShort { expected: usize, actual: usize },

    #[error("VAD inference failed: {message}")]
    Inference { message: String },
}
