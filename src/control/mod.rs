//! Control channel: one TCP peer, newline-delimited JSON

mod channel;
mod protocol;

pub use channel::{ControlChannel, MAX_LINE_BYTES};
pub use protocol::{encode_event, parse_command, Command};
