use std::time::Duration;

/// A fixed-size block of mono audio samples, normalized to [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Mono samples (f32, normalized)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of trailing zero samples added to reach the frame size
    /// (only set by finite sources on their last frame)
    pub padding: usize,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            padding: 0,
        }
    }

    /// Build a frame of exactly `frame_size` samples, zero-padding a short tail
    pub fn padded(mut samples: Vec<f32>, sample_rate: u32, frame_size: usize) -> Self {
        let padding = frame_size.saturating_sub(samples.len());
        samples.resize(samples.len() + padding, 0.0);
        Self {
            samples,
            sample_rate,
            padding,
        }
    }

    /// Samples that came from the source (excludes padding)
    pub fn content(&self) -> &[f32] {
        let end = self.samples.len().saturating_sub(self.padding);
        &self.samples[..end]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Nominal duration of the frame, padding included
    pub fn duration(&self) -> Duration {
        samples_to_duration(self.samples.len(), self.sample_rate)
    }

    /// Duration of the real (non-padded) content
    pub fn content_duration(&self) -> Duration {
        samples_to_duration(self.content().len(), self.sample_rate)
    }
}

/// Re-blocks arbitrarily sized interleaved device buffers into fixed-size mono frames
pub struct FrameAssembler {
    pending: Vec<f32>,
    frame_size: usize,
    sample_rate: u32,
    channels: usize,
}

impl FrameAssembler {
    pub fn new(frame_size: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            pending: Vec::with_capacity(frame_size),
            frame_size: frame_size.max(1),
            sample_rate,
            channels: channels.max(1) as usize,
        }
    }

    /// Feed interleaved samples; returns every frame completed by this buffer.
    /// Only the first channel is kept.
    pub fn push(&mut self, interleaved: impl IntoIterator<Item = f32>) -> Vec<AudioFrame> {
        let mut frames = Vec::new();
        for sample in interleaved.into_iter().step_by(self.channels) {
            self.pending.push(sample);
            if self.pending.len() == self.frame_size {
                let samples = std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_size));
                frames.push(AudioFrame::new(samples, self.sample_rate));
            }
        }
        frames
    }

    /// Samples waiting for the next frame
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

pub fn samples_to_duration(samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(samples as f64 / sample_rate as f64)
}

/// Convert 16-bit PCM to float in [-1.0, 1.0)
pub fn normalize_i16(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Convert normalized float samples to 16-bit PCM for WAV output.
///
/// Values are clamped to [-1.0, 1.0] and scaled by 32767 (truncating).
pub fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

/// Peak absolute amplitude (0.0 for an empty slice)
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |peak, &s| peak.max(s.abs()))
}

/// True when no sample reaches `threshold` (microphone effectively off)
pub fn is_near_silent(samples: &[f32], threshold: f32) -> bool {
    peak_amplitude(samples) < threshold
}
