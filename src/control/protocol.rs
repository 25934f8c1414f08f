use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::session::SessionEvent;

/// Commands accepted from the control client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    StartRecording,
    StopRecording,
    Shutdown,
    /// Synthesized when the peer closes the connection; never read from the wire
    #[serde(skip_deserializing)]
    Disconnect,
}

/// Parse one inbound line. Malformed or unknown commands yield `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<Command>(line) {
        Ok(command) => Some(command),
        Err(e) => {
            debug!("Ignoring control line {:?}: {}", line, e);
            None
        }
    }
}

/// Encode an event as a single `\n`-terminated JSON line
pub fn encode_event(event: &SessionEvent) -> String {
    // Plain string/number/bool fields only; serialization cannot fail
    let mut line = serde_json::to_string(event)
        .unwrap_or_else(|_| format!("{{\"type\":\"{}\"}}", event.kind()));
    line.push('\n');
    line
}
