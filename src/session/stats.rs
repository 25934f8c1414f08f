use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SessionState;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current session state
    pub state: SessionState,

    /// Identifier of the active (or last) session
    pub session_id: Option<Uuid>,

    /// When the recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Audio ingested this session, in seconds
    pub recorded_secs: f64,

    /// Chunks flushed so far (the chunk counter)
    pub chunks_count: u32,

    /// Audio waiting in the current chunk, in seconds
    pub pending_chunk_secs: f64,

    /// Whether the microphone-off guard fired
    pub mic_off: bool,
}
