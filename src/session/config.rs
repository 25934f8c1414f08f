use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a recording session
///
/// Immutable once handed to a [`RecordingSession`](super::RecordingSession).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory that receives chunk and full-session WAV files
    pub output_dir: PathBuf,

    /// Filename prefix: `{prefix}_chunk_001.wav`, `{prefix}-20250101-120000.wav`
    pub filename_prefix: String,

    /// Sample rate of ingested frames (VAD expects 16kHz)
    pub sample_rate: u32,

    /// Sustained silence that ends a chunk
    /// Default: 5 seconds
    pub silence_threshold: Duration,

    /// A silence boundary is ignored until the chunk is at least this long
    /// Default: 10 seconds
    pub min_chunk_duration: Duration,

    /// Hard ceiling: a chunk is flushed once it reaches this length
    /// Default: 120 seconds
    pub max_chunk_duration: Duration,

    /// Speech iff the classifier's probability is above this value
    pub vad_threshold: f32,

    /// Trailing window handed to the classifier (512 samples = 32ms at 16kHz)
    pub vad_window_samples: usize,

    /// Silence classifications in a row before the silence timer starts
    pub consecutive_silence_required: u32,

    /// Peak amplitude below which a frame counts as "microphone off"
    pub mic_off_amplitude: f32,

    /// Startup silence that triggers the microphone-off warning
    pub mic_off_duration: Duration,

    /// Emit `debug` events to the control client
    pub emit_debug_events: bool,
}

impl SessionConfig {
    pub fn new(output_dir: impl Into<PathBuf>, filename_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            filename_prefix: filename_prefix.into(),
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            filename_prefix: "recording".to_string(),
            sample_rate: 16000,
            silence_threshold: Duration::from_secs(5),
            min_chunk_duration: Duration::from_secs(10),
            max_chunk_duration: Duration::from_secs(120),
            vad_threshold: 0.5,
            vad_window_samples: 512,
            consecutive_silence_required: 2,
            mic_off_amplitude: 0.01,
            mic_off_duration: Duration::from_secs(2),
            emit_debug_events: false,
        }
    }
}
