use super::boundary::{classify, BoundaryPolicy, Classification, VoiceActivityTracker};
use super::buffer::ChunkBuffer;
use super::clock::Clock;
use super::config::SessionConfig;
use super::events::SessionEvent;
use super::guard::{MicStatus, SilenceGuard};
use super::stats::SessionStats;
use crate::audio::frame::{samples_to_duration, to_i16};
use crate::audio::{AudioFrame, PersistenceSink};
use crate::vad::VoiceActivity;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Recording lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
}

/// Chunk-boundary state machine for one recording at a time
///
/// Owns the chunk buffer, the full-session buffer and every timer. It has no
/// I/O of its own besides the persistence sink: each operation returns the
/// events the caller must deliver, in order.
pub struct RecordingSession {
    config: SessionConfig,
    policy: BoundaryPolicy,
    vad: Box<dyn VoiceActivity>,
    sink: Box<dyn PersistenceSink>,
    clock: Arc<dyn Clock>,

    state: SessionState,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    /// File-name stem shared by every artifact of the current session
    stem: String,

    /// Audio since the last flush
    chunk: ChunkBuffer,
    /// Audio since start, for the complete-file artifact
    full_session: Vec<f32>,
    /// Last chunk number handed out (1-based, reset per session)
    chunk_num: u32,

    guard: SilenceGuard,
    tracker: VoiceActivityTracker,
    mic_off: bool,
    frames_ingested: u64,
}

impl RecordingSession {
    pub fn new(
        config: SessionConfig,
        vad: Box<dyn VoiceActivity>,
        sink: Box<dyn PersistenceSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            "Recording session configured: {} (silence {:.1}s, chunk {:.1}s-{:.1}s, vad={})",
            config.output_dir.display(),
            config.silence_threshold.as_secs_f64(),
            config.min_chunk_duration.as_secs_f64(),
            config.max_chunk_duration.as_secs_f64(),
            vad.name()
        );

        let policy = BoundaryPolicy {
            silence_threshold: config.silence_threshold,
            min_chunk_duration: config.min_chunk_duration,
            max_chunk_duration: config.max_chunk_duration,
        };
        let guard = SilenceGuard::new(config.mic_off_amplitude, config.mic_off_duration);
        let tracker = VoiceActivityTracker::new(config.consecutive_silence_required);

        Self {
            config,
            policy,
            vad,
            sink,
            clock,
            state: SessionState::Idle,
            session_id: None,
            started_at: None,
            stem: String::new(),
            chunk: ChunkBuffer::new(),
            full_session: Vec::new(),
            chunk_num: 0,
            guard,
            tracker,
            mic_off: false,
            frames_ingested: 0,
        }
    }

    /// Idle -> Recording. A no-op while already recording.
    pub fn start(&mut self) -> Vec<SessionEvent> {
        if self.state == SessionState::Recording {
            warn!("Recording already started");
            return Vec::new();
        }

        self.reset();
        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.started_at = Some(Utc::now());
        self.stem = session_stem(&self.config.filename_prefix, &session_id);
        self.chunk.open(self.clock.now());
        self.state = SessionState::Recording;

        info!("Recording session started: {}", session_id);
        vec![SessionEvent::RecordingStarted]
    }

    /// Feed one captured frame. Frames arriving while idle are dropped.
    pub fn ingest(&mut self, frame: AudioFrame) -> Vec<SessionEvent> {
        if self.state != SessionState::Recording {
            trace!("Dropping frame while idle ({} samples)", frame.len());
            return Vec::new();
        }

        if frame.sample_rate != self.config.sample_rate {
            return self.fail(format!(
                "Frame sample rate {}Hz does not match session rate {}Hz",
                frame.sample_rate, self.config.sample_rate
            ));
        }

        self.clock.on_frame(frame.duration());
        let now = self.clock.now();
        let mut events = Vec::new();

        if self.frames_ingested == 0 && self.config.emit_debug_events {
            events.push(SessionEvent::debug(format!(
                "First audio frame: {} samples at {}Hz",
                frame.len(),
                frame.sample_rate
            )));
        }
        self.frames_ingested += 1;

        self.chunk.push(&frame, now);
        self.full_session.extend_from_slice(&frame.samples);

        if self.guard.observe(&frame, now) == Some(MicStatus::Off) {
            warn!(
                "No audio above {:.3} for {:.1}s, microphone may be off",
                self.config.mic_off_amplitude,
                self.config.mic_off_duration.as_secs_f64()
            );
            self.mic_off = true;
            events.push(SessionEvent::SilenceWarning {
                message: "Perfect silence detected - microphone may be off".to_string(),
            });
            events.extend(self.finalize());
            return events;
        }

        if self.policy.max_duration_reached(self.chunk.elapsed(now)) {
            debug!(
                "Chunk reached max duration ({:.1}s)",
                self.chunk.elapsed(now).as_secs_f64()
            );
            events.extend(self.flush(false, now));
            return events;
        }

        let Some(window) = self.chunk.window(self.config.vad_window_samples) else {
            return events;
        };

        let classification = classify(
            self.vad.as_mut(),
            window,
            self.config.sample_rate,
            self.config.vad_threshold,
        );
        if let Classification::FailedOpen(e) = &classification {
            warn!("VAD failed, treating window as speech: {}", e);
            events.push(SessionEvent::error(format!("VAD detection error: {}", e)));
        }
        self.tracker.observe(classification.is_speech(), now);

        if self
            .policy
            .silence_flush_due(self.chunk.elapsed(now), self.tracker.silence_elapsed(now))
        {
            debug!(
                "Silence boundary after {:.1}s",
                self.chunk.elapsed(now).as_secs_f64()
            );
            events.extend(self.flush(false, now));
            self.tracker.reset();
        }

        events
    }

    /// Recording -> Idle via an explicit stop
    pub fn stop(&mut self) -> Vec<SessionEvent> {
        if self.state == SessionState::Recording {
            info!("Stopping recording session");
        }
        self.finalize()
    }

    /// Report a fatal ingestion error and finalize whatever was captured
    pub fn fail(&mut self, reason: impl Display) -> Vec<SessionEvent> {
        error!("Recording error: {}", reason);
        let mut events = vec![SessionEvent::error(format!("Recording error: {}", reason))];
        events.extend(self.finalize());
        events
    }

    /// Flush the trailing chunk (unless the microphone was off), save the
    /// full-session file and return to Idle. Idempotent.
    pub fn finalize(&mut self) -> Vec<SessionEvent> {
        if self.state == SessionState::Idle {
            return Vec::new();
        }

        let now = self.clock.now();
        let stats = self.stats();
        let mut events = Vec::new();

        if self.mic_off {
            if !self.chunk.is_empty() {
                info!(
                    "Discarding trailing chunk ({} samples): microphone off",
                    self.chunk.sample_count()
                );
            }
        } else {
            events.extend(self.flush(true, now));
        }

        events.extend(self.save_complete_recording());
        events.push(SessionEvent::RecordingStopped);

        info!(
            "Recording session stopped: {} ({:.1}s recorded, {} chunks)",
            stats.session_id.map(|id| id.to_string()).unwrap_or_default(),
            stats.recorded_secs,
            self.chunk_num
        );

        self.state = SessionState::Idle;
        self.chunk.clear();
        self.full_session = Vec::new();
        self.chunk_num = 0;

        events
    }

    fn reset(&mut self) {
        self.chunk.clear();
        self.full_session.clear();
        self.chunk_num = 0;
        self.guard.reset();
        self.tracker.reset();
        self.mic_off = false;
        self.frames_ingested = 0;
    }

    /// Snapshot-and-reset the chunk buffer and persist it
    fn flush(&mut self, is_final: bool, now: Instant) -> Option<SessionEvent> {
        let samples = self.chunk.take(now);
        if samples.is_empty() {
            return None;
        }

        self.chunk_num += 1;
        let path = self.chunk_path(self.chunk_num);

        match self
            .sink
            .write(&to_i16(&samples), self.config.sample_rate, &path)
        {
            Ok(()) => {
                info!(
                    "Chunk {} saved: {} ({:.1}s{})",
                    self.chunk_num,
                    path.display(),
                    samples_to_duration(samples.len(), self.config.sample_rate).as_secs_f64(),
                    if is_final { ", final" } else { "" }
                );
                Some(SessionEvent::ChunkReady {
                    chunk_num: self.chunk_num,
                    audio_file: path.display().to_string(),
                    is_final,
                })
            }
            Err(e) => {
                error!("Failed to save chunk {}: {:#}", self.chunk_num, e);
                Some(SessionEvent::error(format!(
                    "Failed to save chunk {}: {:#}",
                    self.chunk_num, e
                )))
            }
        }
    }

    fn save_complete_recording(&mut self) -> Option<SessionEvent> {
        if self.full_session.is_empty() {
            return None;
        }

        let samples = std::mem::take(&mut self.full_session);
        let path = self.config.output_dir.join(format!("{}.wav", self.stem));

        match self
            .sink
            .write(&to_i16(&samples), self.config.sample_rate, &path)
        {
            Ok(()) => {
                info!("Complete recording saved: {}", path.display());
                Some(SessionEvent::CompleteFile {
                    file_path: path.display().to_string(),
                })
            }
            Err(e) => {
                error!("Failed to save complete recording: {:#}", e);
                Some(SessionEvent::error(format!(
                    "Failed to save complete recording: {:#}",
                    e
                )))
            }
        }
    }

    fn chunk_path(&self, chunk_num: u32) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}_chunk_{:03}.wav", self.stem, chunk_num))
    }

    /// Name stem of the current (or last) session's files, e.g. `loqa-20250101-120000-1a2b3c4d`
    pub fn artifact_stem(&self) -> Option<&str> {
        if self.stem.is_empty() {
            None
        } else {
            Some(&self.stem)
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.state,
            session_id: self.session_id,
            started_at: self.started_at,
            recorded_secs: samples_to_duration(self.full_session.len(), self.config.sample_rate)
                .as_secs_f64(),
            chunks_count: self.chunk_num,
            pending_chunk_secs: samples_to_duration(
                self.chunk.sample_count(),
                self.config.sample_rate,
            )
            .as_secs_f64(),
            mic_off: self.mic_off,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Last chunk number handed out this session
    pub fn chunk_num(&self) -> u32 {
        self.chunk_num
    }

    pub fn mic_off(&self) -> bool {
        self.mic_off
    }

    pub fn chunk_buffer(&self) -> &ChunkBuffer {
        &self.chunk
    }

    /// Samples held for the complete-file artifact
    pub fn full_session_len(&self) -> usize {
        self.full_session.len()
    }

    pub fn tracker(&self) -> &VoiceActivityTracker {
        &self.tracker
    }

    pub fn guard(&self) -> &SilenceGuard {
        &self.guard
    }
}

/// `{prefix}-{local start time}-{session id prefix}`; unique even for sessions
/// started within the same second
fn session_stem(prefix: &str, session_id: &Uuid) -> String {
    let id = session_id.simple().to_string();
    format!(
        "{}-{}-{}",
        prefix,
        Local::now().format("%Y%m%d-%H%M%S"),
        &id[..8]
    )
}
