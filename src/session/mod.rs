//! Recording session management
//!
//! This module provides the `RecordingSession` state machine that decides,
//! frame by frame, where chunk boundaries fall:
//! - Chunk and full-session buffering
//! - Max-duration and silence-based flushing (`BoundaryPolicy`)
//! - Debounced voice-activity tracking with a fail-open classifier
//! - Startup microphone-off detection (`SilenceGuard`)
//! - Lifecycle events for the control client

mod boundary;
mod buffer;
mod clock;
mod config;
mod events;
mod guard;
mod session;
mod stats;

pub use boundary::{classify, BoundaryPolicy, Classification, VoiceActivityTracker};
pub use buffer::ChunkBuffer;
pub use clock::{Clock, StreamClock, SystemClock};
pub use config::SessionConfig;
pub use events::SessionEvent;
pub use guard::{GuardState, MicStatus, SilenceGuard};
pub use session::{RecordingSession, SessionState};
pub use stats::SessionStats;
