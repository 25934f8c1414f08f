// Shared helpers for integration tests
#![allow(dead_code)]

use anyhow::{bail, Result};
use loqa_stream::audio::frame::peak_amplitude;
use loqa_stream::{
    AudioFrame, PersistenceSink, RecordingSession, SessionConfig, StreamClock, VadError,
    VoiceActivity,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 16000;
/// 0.5s frames
pub const FRAME_SIZE: usize = 8000;

/// Speech iff the window's peak is above 0.05
pub struct AmplitudeVad;

impl VoiceActivity for AmplitudeVad {
    fn speech_probability(&mut self, window: &[f32], _sample_rate: u32) -> Result<f32, VadError> {
        Ok(if peak_amplitude(window) > 0.05 { 0.9 } else { 0.05 })
    }

    fn name(&self) -> &str {
        "amplitude"
    }
}

/// Classifier that always errors
pub struct FailingVad;

impl VoiceActivity for FailingVad {
    fn speech_probability(&mut self, _window: &[f32], _sample_rate: u32) -> Result<f32, VadError> {
        Err(VadError::Inference {
            message: "model not loaded".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

#[derive(Debug, Clone)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

/// Records every write in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: Arc<Mutex<Vec<WrittenFile>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<WrittenFile> {
        self.files.lock().unwrap().clone()
    }

    pub fn chunks(&self) -> Vec<WrittenFile> {
        self.files()
            .into_iter()
            .filter(|f| f.path.to_string_lossy().contains("_chunk_"))
            .collect()
    }

    pub fn complete_files(&self) -> Vec<WrittenFile> {
        self.files()
            .into_iter()
            .filter(|f| !f.path.to_string_lossy().contains("_chunk_"))
            .collect()
    }
}

impl PersistenceSink for MemorySink {
    fn write(&mut self, samples: &[i16], sample_rate: u32, path: &Path) -> Result<()> {
        self.files.lock().unwrap().push(WrittenFile {
            path: path.to_path_buf(),
            samples: samples.to_vec(),
            sample_rate,
        });
        Ok(())
    }
}

/// Sink whose every write fails
pub struct FailingSink;

impl PersistenceSink for FailingSink {
    fn write(&mut self, _samples: &[i16], _sample_rate: u32, path: &Path) -> Result<()> {
        bail!("disk full writing {}", path.display())
    }
}

/// Short timers so scenarios stay small: silence 1s, chunk 2s..6s
pub fn test_config(output_dir: impl Into<PathBuf>) -> SessionConfig {
    SessionConfig {
        silence_threshold: Duration::from_secs(1),
        min_chunk_duration: Duration::from_secs(2),
        max_chunk_duration: Duration::from_secs(6),
        ..SessionConfig::new(output_dir, "test")
    }
}

pub fn new_session(
    config: SessionConfig,
    vad: impl VoiceActivity + 'static,
    sink: impl PersistenceSink + 'static,
) -> (RecordingSession, Arc<StreamClock>) {
    let clock = Arc::new(StreamClock::new());
    let session = RecordingSession::new(config, Box::new(vad), Box::new(sink), clock.clone());
    (session, clock)
}

pub fn speech_frame() -> AudioFrame {
    AudioFrame::new(vec![0.3; FRAME_SIZE], SAMPLE_RATE)
}

/// Quiet enough for the VAD, loud enough for the microphone-off guard
pub fn quiet_frame() -> AudioFrame {
    AudioFrame::new(vec![0.02; FRAME_SIZE], SAMPLE_RATE)
}

pub fn zero_frame() -> AudioFrame {
    AudioFrame::new(vec![0.0; FRAME_SIZE], SAMPLE_RATE)
}

/// Mono 16-bit WAV of `seconds` of a constant level
pub fn write_wav(path: &Path, sample_rate: u32, seconds: f32, level: f32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    let count = (sample_rate as f32 * seconds) as usize;
    for _ in 0..count {
        writer.write_sample((level * 32767.0) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
