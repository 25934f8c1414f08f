use std::time::{Duration, Instant};

use crate::audio::AudioFrame;

/// Audio accumulated since the last flush
///
/// Invariant: whenever samples are present, `started_at` is set.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    samples: Vec<f32>,
    frames: usize,
    started_at: Option<Instant>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new chunk at `now`, discarding anything buffered
    pub fn open(&mut self, now: Instant) {
        self.samples.clear();
        self.frames = 0;
        self.started_at = Some(now);
    }

    pub fn push(&mut self, frame: &AudioFrame, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.samples.extend_from_slice(&frame.samples);
        self.frames += 1;
    }

    /// Snapshot the buffered samples and reset the chunk to start at `now`
    pub fn take(&mut self, now: Instant) -> Vec<f32> {
        self.frames = 0;
        self.started_at = Some(now);
        std::mem::take(&mut self.samples)
    }

    /// Drop everything and return to the closed state
    pub fn clear(&mut self) {
        self.samples = Vec::new();
        self.frames = 0;
        self.started_at = None;
    }

    /// Most recent `size` samples, or `None` if fewer are buffered
    pub fn window(&self, size: usize) -> Option<&[f32]> {
        if size == 0 || self.samples.len() < size {
            return None;
        }
        Some(&self.samples[self.samples.len() - size..])
    }

    /// Time since the chunk started (zero when closed)
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }
}
