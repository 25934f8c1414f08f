pub mod audio;
pub mod config;
pub mod control;
pub mod error;
pub mod server;
pub mod session;
pub mod signal;
pub mod vad;

pub use audio::{
    create_source, AudioFile, AudioFrame, AudioFrameSource, Pacing, PersistenceSink,
    ReplaySource, SourceConfig, SourceKind, WavSink,
};
pub use config::Config;
pub use control::{Command, ControlChannel, MAX_LINE_BYTES};
pub use error::{CaptureError, VadError};
pub use server::{Server, ServerConfig};
pub use session::{
    Clock, RecordingSession, SessionConfig, SessionEvent, SessionState, SessionStats,
    StreamClock, SystemClock,
};
pub use vad::{EnergyVad, EnergyVadConfig, VoiceActivity};
