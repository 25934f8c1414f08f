pub mod file;
pub mod frame;
pub mod replay;
pub mod sink;
pub mod source;

#[cfg(feature = "live-capture")]
pub mod live;

pub use file::AudioFile;
pub use frame::{AudioFrame, FrameAssembler};
pub use replay::{Pacing, ReplaySource};
pub use sink::{PersistenceSink, WavSink};
pub use source::{create_source, AudioFrameSource, SourceConfig, SourceKind};

#[cfg(feature = "live-capture")]
pub use live::LiveSource;
