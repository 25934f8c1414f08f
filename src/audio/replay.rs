use anyhow::Result;
use std::path::Path;
use tokio::time::Instant;
use tracing::{debug, info};

use super::file::AudioFile;
use super::frame::AudioFrame;
use super::source::{AudioFrameSource, SourceConfig};
use crate::error::CaptureError;

/// How a replay source paces its frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// One frame per nominal frame duration, like a capture device
    Realtime,
    /// Frames are emitted as fast as they are requested
    Batch,
}

/// Finite frame source backed by pre-loaded samples
///
/// Every `start` rewinds to the beginning. The final frame is zero-padded
/// to the configured frame size.
pub struct ReplaySource {
    name: String,
    samples: Vec<f32>,
    config: SourceConfig,
    pacing: Pacing,
    position: usize,
    capturing: bool,
    /// Deadline of the next frame in realtime mode
    next_due: Option<Instant>,
}

impl ReplaySource {
    pub fn new(samples: Vec<f32>, config: SourceConfig, pacing: Pacing) -> Self {
        Self {
            name: "replay".to_string(),
            samples,
            config,
            pacing,
            position: 0,
            capturing: false,
            next_due: None,
        }
    }

    /// Load a WAV file for replay
    ///
    /// The file must already be at the configured sample rate; no resampling is done.
    pub fn from_file(path: impl AsRef<Path>, config: SourceConfig, pacing: Pacing) -> Result<Self> {
        let audio = AudioFile::open(path.as_ref())?;
        if audio.sample_rate != config.sample_rate {
            return Err(CaptureError::UnsupportedFormat {
                message: format!(
                    "{} is {}Hz, expected {}Hz",
                    audio.path, audio.sample_rate, config.sample_rate
                ),
            }
            .into());
        }

        if audio.samples.is_empty() {
            return Err(CaptureError::Replay {
                message: format!("{} contains no audio", audio.path),
            }
            .into());
        }

        let mut source = Self::new(audio.samples, config, pacing);
        source.name = format!("replay:{}", audio.path);
        Ok(source)
    }

    /// Number of frames a full pass produces
    pub fn frame_count(&self) -> usize {
        self.samples.len().div_ceil(self.config.frame_size)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl AudioFrameSource for ReplaySource {
    async fn start(&mut self) -> Result<(), CaptureError> {
        self.position = 0;
        self.capturing = true;
        self.next_due = match self.pacing {
            Pacing::Realtime => Some(Instant::now() + self.config.frame_duration()),
            Pacing::Batch => None,
        };

        info!(
            "Replay source started: {} ({} frames of {} samples)",
            self.name,
            self.frame_count(),
            self.config.frame_size
        );

        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError> {
        if !self.capturing {
            return Err(CaptureError::NotStarted {
                source_name: self.name.clone(),
            });
        }

        if self.position >= self.samples.len() {
            debug!("Replay source exhausted: {}", self.name);
            return Ok(None);
        }

        // Sleeping before touching `position` keeps this cancel safe
        match self.next_due {
            Some(due) => tokio::time::sleep_until(due).await,
            None => tokio::task::yield_now().await,
        }

        let end = (self.position + self.config.frame_size).min(self.samples.len());
        let frame = AudioFrame::padded(
            self.samples[self.position..end].to_vec(),
            self.config.sample_rate,
            self.config.frame_size,
        );
        self.position = end;

        if let Some(due) = self.next_due.as_mut() {
            *due += self.config.frame_duration();
        }

        Ok(Some(frame))
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.capturing = false;
        self.next_due = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        &self.name
    }
}
