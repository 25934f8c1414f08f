use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use super::frame::AudioFrame;
use super::replay::{Pacing, ReplaySource};
use crate::error::CaptureError;

/// Configuration shared by every frame source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Sample rate of emitted frames in Hz
    pub sample_rate: u32,
    /// Samples per frame
    pub frame_size: usize,
}

impl SourceConfig {
    pub fn from_frame_duration(sample_rate: u32, frame_duration: Duration) -> Self {
        let frame_size = (sample_rate as f64 * frame_duration.as_secs_f64()).round() as usize;
        Self {
            sample_rate,
            frame_size: frame_size.max(1),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        super::frame::samples_to_duration(self.frame_size, self.sample_rate)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for Whisper
            frame_size: 8000,   // 500ms frames
        }
    }
}

/// Producer of fixed-size mono frames
///
/// Implementations:
/// - `LiveSource`: microphone capture, endless until stopped or the device fails
/// - `ReplaySource`: pre-loaded samples (testing/batch processing), finite
#[async_trait::async_trait]
pub trait AudioFrameSource: Send {
    /// Start producing frames
    async fn start(&mut self) -> Result<(), CaptureError>;

    /// Wait for the next frame
    ///
    /// `Ok(None)` marks end of stream; `Err` is a capture failure.
    /// Must be cancel safe: a dropped call never loses a frame.
    async fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError>;

    /// Stop producing frames
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if the source is currently producing
    fn is_capturing(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Where audio comes from
#[derive(Debug, Clone)]
pub enum SourceKind {
    /// Default input device
    Microphone { device: Option<String> },
    /// WAV file replayed as if it were captured
    Replay { path: PathBuf, pacing: Pacing },
}

/// Create a frame source for the given kind
pub fn create_source(kind: SourceKind, config: SourceConfig) -> Result<Box<dyn AudioFrameSource>> {
    match kind {
        SourceKind::Replay { path, pacing } => {
            let source = ReplaySource::from_file(&path, config, pacing)?;
            Ok(Box::new(source))
        }

        SourceKind::Microphone { device } => {
            #[cfg(feature = "live-capture")]
            {
                let source = super::live::LiveSource::new(device, config);
                Ok(Box::new(source))
            }

            #[cfg(not(feature = "live-capture"))]
            {
                let _ = (device, config);
                anyhow::bail!(
                    "Microphone capture requires the `live-capture` feature; use --replay <wav> instead"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_from_frame_duration() {
        let config = SourceConfig::from_frame_duration(16000, Duration::from_millis(500));
        assert_eq!(config.frame_size, 8000);
        assert_eq!(config.frame_duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_source_config_never_empty() {
        let config = SourceConfig::from_frame_duration(16000, Duration::ZERO);
        assert_eq!(config.frame_size, 1);
    }

    #[cfg(not(feature = "live-capture"))]
    #[test]
    fn test_microphone_requires_feature() {
        let result = create_source(
            SourceKind::Microphone { device: None },
            SourceConfig::default(),
        );
        assert!(result.is_err());
    }
}
