use anyhow::{Context, Result};
use clap::Parser;
use loqa_stream::config::InputKind;
use loqa_stream::signal::watch_shutdown_signals;
use loqa_stream::{
    create_source, Clock, Config, ControlChannel, EnergyVad, EnergyVadConfig, RecordingSession,
    Server, StreamClock, SystemClock, WavSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};

/// Streaming audio chunker with a TCP control channel
#[derive(Debug, Parser)]
#[command(name = "loqa-stream", version, about)]
struct Args {
    /// Config file (extension optional; a missing file is allowed)
    #[arg(long, default_value = "config/loqa-stream")]
    config: String,

    /// Output directory for chunks and the complete recording
    #[arg(long)]
    output_dir: Option<String>,

    /// Prefix for chunk filenames
    #[arg(long)]
    filename_prefix: Option<String>,

    /// Seconds of silence that end a chunk
    #[arg(long)]
    silence_threshold: Option<f64>,

    /// Minimum chunk duration in seconds
    #[arg(long)]
    min_chunk_duration: Option<f64>,

    /// Maximum chunk duration in seconds
    #[arg(long)]
    max_chunk_duration: Option<f64>,

    /// Control channel port
    #[arg(long)]
    tcp_port: Option<u16>,

    /// Control channel bind address
    #[arg(long)]
    bind: Option<String>,

    /// Replay a WAV file instead of capturing from the microphone
    #[arg(long, value_name = "WAV")]
    replay: Option<PathBuf>,

    /// Replay as fast as possible instead of in real time
    #[arg(long, requires = "replay")]
    batch: bool,

    /// Send debug events to the control client
    #[arg(long)]
    debug_events: bool,

    /// List input devices and exit
    #[cfg(feature = "live-capture")]
    #[arg(long)]
    list_devices: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.audio.output_dir = dir.clone();
        }
        if let Some(prefix) = &self.filename_prefix {
            config.audio.filename_prefix = prefix.clone();
        }
        if let Some(secs) = self.silence_threshold {
            config.chunking.silence_threshold_secs = secs;
        }
        if let Some(secs) = self.min_chunk_duration {
            config.chunking.min_chunk_duration_secs = secs;
        }
        if let Some(secs) = self.max_chunk_duration {
            config.chunking.max_chunk_duration_secs = secs;
        }
        if let Some(port) = self.tcp_port {
            config.control.port = port;
        }
        if let Some(bind) = &self.bind {
            config.control.bind = bind.clone();
        }
        if let Some(path) = &self.replay {
            config.audio.input = InputKind::Replay;
            config.audio.replay_path = Some(path.display().to_string());
            config.audio.realtime = !self.batch;
        }
        if self.debug_events {
            config.control.debug_events = true;
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    // stdout stays clean; logs go to stderr
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    #[cfg(feature = "live-capture")]
    if args.list_devices {
        for name in loqa_stream::audio::live::list_input_devices()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = Config::load(&args.config)?;
    args.apply(&mut config);
    config.validate()?;

    info!("Loqa Stream v{}", env!("CARGO_PKG_VERSION"));

    let session_config = config.session_config()?;
    info!("Output directory: {}", session_config.output_dir.display());

    let source = create_source(config.source_kind()?, config.source_config()?)
        .context("Failed to create audio source")?;

    let clock: Arc<dyn Clock> = if config.uses_stream_clock() {
        Arc::new(StreamClock::new())
    } else {
        Arc::new(SystemClock)
    };

    let session = RecordingSession::new(
        session_config,
        Box::new(EnergyVad::new(EnergyVadConfig::default())),
        Box::new(WavSink::new()),
        clock,
    );

    let channel = ControlChannel::bind(&config.control_addr()).await?;
    let server = Server::new(config.server_config()?, channel, session, source);

    watch_shutdown_signals(server.running_flag())?;

    server.run().await
}
