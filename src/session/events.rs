use serde::{Deserialize, Serialize};

/// Events sent to the control client, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    ServerReady,
    RecordingStarted,
    RecordingStopped,
    ChunkReady {
        chunk_num: u32,
        audio_file: String,
        is_final: bool,
    },
    CompleteFile {
        file_path: String,
    },
    SilenceWarning {
        message: String,
    },
    Error {
        error: String,
    },
    Debug {
        message: String,
    },
}

impl SessionEvent {
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self::Debug {
            message: message.into(),
        }
    }

    /// The `type` tag as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServerReady => "server_ready",
            Self::RecordingStarted => "recording_started",
            Self::RecordingStopped => "recording_stopped",
            Self::ChunkReady { .. } => "chunk_ready",
            Self::CompleteFile { .. } => "complete_file",
            Self::SilenceWarning { .. } => "silence_warning",
            Self::Error { .. } => "error",
            Self::Debug { .. } => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unit_events_serialize_to_type_only() {
        let value = serde_json::to_value(SessionEvent::ServerReady).unwrap();
        assert_eq!(value, json!({"type": "server_ready"}));

        let value = serde_json::to_value(SessionEvent::RecordingStopped).unwrap();
        assert_eq!(value, json!({"type": "recording_stopped"}));
    }

    #[test]
    fn test_chunk_ready_shape() {
        let event = SessionEvent::ChunkReady {
            chunk_num: 3,
            audio_file: "/tmp/test_chunk_003.wav".to_string(),
            is_final: true,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "chunk_ready",
                "chunk_num": 3,
                "audio_file": "/tmp/test_chunk_003.wav",
                "is_final": true
            })
        );
        assert_eq!(event.kind(), "chunk_ready");
    }

    #[test]
    fn test_error_and_debug_fields() {
        let value = serde_json::to_value(SessionEvent::error("Something went wrong")).unwrap();
        assert_eq!(value, json!({"type": "error", "error": "Something went wrong"}));

        let value = serde_json::to_value(SessionEvent::debug("Debug message")).unwrap();
        assert_eq!(value, json!({"type": "debug", "message": "Debug message"}));
    }

    #[test]
    fn test_kind_matches_wire_tag() {
        let events = [
            SessionEvent::RecordingStarted,
            SessionEvent::CompleteFile {
                file_path: "x.wav".to_string(),
            },
            SessionEvent::SilenceWarning {
                message: "quiet".to_string(),
            },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }
}
