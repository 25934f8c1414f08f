use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::{Pacing, SourceConfig, SourceKind};
use crate::server::ServerConfig;
use crate::session::SessionConfig;

/// Application configuration
///
/// Layered: built-in defaults, then an optional TOML file, then
/// `LOQA_STREAM__SECTION__KEY` environment variables. CLI flags are
/// applied on top by the binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub control: ControlConfig,
    pub audio: AudioConfig,
    pub chunking: ChunkingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub bind: String,
    pub port: u16,
    pub connect_timeout_secs: f64,
    pub reconnect_timeout_secs: f64,
    pub poll_interval_ms: u64,
    pub debug_events: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 12345,
            connect_timeout_secs: 60.0,
            reconnect_timeout_secs: 60.0,
            poll_interval_ms: 100,
            debug_events: false,
        }
    }
}

/// Where audio comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Microphone,
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Supports `~` expansion
    pub output_dir: String,
    pub filename_prefix: String,
    pub sample_rate: u32,
    pub frame_duration_secs: f64,
    pub input: InputKind,
    pub device: Option<String>,
    pub replay_path: Option<String>,
    /// Replay at capture speed instead of as fast as possible
    pub realtime: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            output_dir: "~/loqa-stream/recordings".to_string(),
            filename_prefix: "recording".to_string(),
            sample_rate: 16000,
            frame_duration_secs: 0.5,
            input: InputKind::Microphone,
            device: None,
            replay_path: None,
            realtime: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub silence_threshold_secs: f64,
    pub min_chunk_duration_secs: f64,
    pub max_chunk_duration_secs: f64,
    pub vad_threshold: f32,
    pub vad_window_samples: usize,
    pub consecutive_silence_required: u32,
    pub mic_off_amplitude: f32,
    pub mic_off_duration_secs: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            silence_threshold_secs: 5.0,
            min_chunk_duration_secs: 10.0,
            max_chunk_duration_secs: 120.0,
            vad_threshold: 0.5,
            vad_window_samples: 512,
            consecutive_silence_required: 2,
            mic_off_amplitude: 0.01,
            mic_off_duration_secs: 2.0,
        }
    }
}

impl Config {
    /// Load from `path` (extension optional, missing file allowed) and the environment
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LOQA_STREAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the chunking rules meaningless
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        for (name, value) in [
            ("silence_threshold_secs", c.silence_threshold_secs),
            ("min_chunk_duration_secs", c.min_chunk_duration_secs),
            ("max_chunk_duration_secs", c.max_chunk_duration_secs),
            ("mic_off_duration_secs", c.mic_off_duration_secs),
            ("frame_duration_secs", self.audio.frame_duration_secs),
            ("connect_timeout_secs", self.control.connect_timeout_secs),
            ("reconnect_timeout_secs", self.control.reconnect_timeout_secs),
        ] {
            secs(name, value)?;
        }

        if !(0.0..=1.0).contains(&c.vad_threshold) {
            anyhow::bail!("vad_threshold must be within [0, 1], got {}", c.vad_threshold);
        }
        if c.vad_window_samples == 0 {
            anyhow::bail!("vad_window_samples must be positive");
        }
        if c.max_chunk_duration_secs < c.min_chunk_duration_secs {
            anyhow::bail!(
                "max_chunk_duration_secs ({}) must not be below min_chunk_duration_secs ({})",
                c.max_chunk_duration_secs,
                c.min_chunk_duration_secs
            );
        }
        if self.audio.sample_rate == 0 {
            anyhow::bail!("sample_rate must be positive");
        }
        if self.audio.filename_prefix.is_empty() {
            anyhow::bail!("filename_prefix must not be empty");
        }
        if self.audio.input == InputKind::Replay && self.audio.replay_path.is_none() {
            anyhow::bail!("input = \"replay\" requires replay_path");
        }
        Ok(())
    }

    /// `host:port` for the control listener
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.control.bind, self.control.port)
    }

    /// Output directory with `~` and `$VAR` expanded
    pub fn output_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.audio.output_dir)
            .with_context(|| format!("Failed to expand output dir {}", self.audio.output_dir))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        let c = &self.chunking;
        Ok(SessionConfig {
            output_dir: self.output_dir()?,
            filename_prefix: self.audio.filename_prefix.clone(),
            sample_rate: self.audio.sample_rate,
            silence_threshold: secs("silence_threshold_secs", c.silence_threshold_secs)?,
            min_chunk_duration: secs("min_chunk_duration_secs", c.min_chunk_duration_secs)?,
            max_chunk_duration: secs("max_chunk_duration_secs", c.max_chunk_duration_secs)?,
            vad_threshold: c.vad_threshold,
            vad_window_samples: c.vad_window_samples,
            consecutive_silence_required: c.consecutive_silence_required,
            mic_off_amplitude: c.mic_off_amplitude,
            mic_off_duration: secs("mic_off_duration_secs", c.mic_off_duration_secs)?,
            emit_debug_events: self.control.debug_events,
        })
    }

    pub fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            connect_timeout: secs("connect_timeout_secs", self.control.connect_timeout_secs)?,
            reconnect_timeout: secs("reconnect_timeout_secs", self.control.reconnect_timeout_secs)?,
            poll_interval: Duration::from_millis(self.control.poll_interval_ms.max(1)),
            emit_debug_events: self.control.debug_events,
        })
    }

    pub fn source_config(&self) -> Result<SourceConfig> {
        Ok(SourceConfig::from_frame_duration(
            self.audio.sample_rate,
            secs("frame_duration_secs", self.audio.frame_duration_secs)?,
        ))
    }

    pub fn source_kind(&self) -> Result<SourceKind> {
        match self.audio.input {
            InputKind::Microphone => Ok(SourceKind::Microphone {
                device: self.audio.device.clone(),
            }),
            InputKind::Replay => {
                let path = self
                    .audio
                    .replay_path
                    .as_deref()
                    .context("input = \"replay\" requires replay_path")?;
                let path = shellexpand::full(path)
                    .with_context(|| format!("Failed to expand replay path {}", path))?;
                let pacing = if self.audio.realtime {
                    Pacing::Realtime
                } else {
                    Pacing::Batch
                };
                Ok(SourceKind::Replay {
                    path: PathBuf::from(path.as_ref()),
                    pacing,
                })
            }
        }
    }

    /// Batch replay runs on audio time rather than wall time
    pub fn uses_stream_clock(&self) -> bool {
        self.audio.input == InputKind::Replay && !self.audio.realtime
    }
}

/// Seconds from config as a `Duration`; negative, NaN or overflowing values are errors
fn secs(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{} must be a non-negative number of seconds, got {}", name, value))
}
