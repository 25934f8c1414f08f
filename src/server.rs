use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::audio::{AudioFrame, AudioFrameSource};
use crate::control::{Command, ControlChannel};
use crate::error::CaptureError;
use crate::session::{RecordingSession, SessionEvent};

/// Timeouts for the control loop
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How long to wait for the first control client
    pub connect_timeout: Duration,
    /// How long to wait for a client after a disconnect
    pub reconnect_timeout: Duration,
    /// Upper bound on a single command poll
    pub poll_interval: Duration,
    /// Emit a `debug` event when the audio stream ends
    pub emit_debug_events: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(60),
            reconnect_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(100),
            emit_debug_events: false,
        }
    }
}

enum Input {
    Frame(Result<Option<AudioFrame>, CaptureError>),
    Command(Option<Command>),
}

/// Owns the session, the frame source and the control channel
///
/// Frames and commands are handled one at a time on this task, so every
/// session mutation is serialized.
pub struct Server {
    config: ServerConfig,
    channel: ControlChannel,
    session: RecordingSession,
    source: Box<dyn AudioFrameSource>,
    running: Arc<AtomicBool>,
}

impl Server {
    pub fn new(
        config: ServerConfig,
        mut channel: ControlChannel,
        session: RecordingSession,
        source: Box<dyn AudioFrameSource>,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        channel.set_running_flag(Arc::clone(&running));

        Self {
            config,
            channel,
            session,
            source,
            running,
        }
    }

    /// Flag polled by the control loop and by client waits; clearing it requests a graceful shutdown
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Serve until shutdown, a missed reconnect, or no initial client
    pub async fn run(mut self) -> Result<()> {
        if !self.channel.wait_for_client(self.config.connect_timeout).await {
            info!("No control client connected, shutting down");
            self.channel.close().await;
            return Ok(());
        }

        if !self.channel.send_event(&SessionEvent::ServerReady).await {
            self.handle_disconnect().await;
        }

        info!("Server ready (audio source: {})", self.source.name());

        while self.running.load(Ordering::SeqCst) {
            let input = if self.session.is_recording() && self.source.is_capturing() {
                tokio::select! {
                    frame = self.source.next_frame() => Input::Frame(frame),
                    command = self.channel.receive_command(self.config.poll_interval) => Input::Command(command),
                }
            } else {
                Input::Command(self.channel.receive_command(self.config.poll_interval).await)
            };

            match input {
                Input::Frame(Ok(Some(frame))) => {
                    let events = self.session.ingest(frame);
                    if !self.session.is_recording() {
                        // Microphone-off guard or a fatal frame ended the session
                        self.stop_source().await;
                    }
                    self.dispatch(events).await;
                }
                Input::Frame(Ok(None)) => {
                    info!("Audio source {} reached end of stream", self.source.name());
                    let mut events = Vec::new();
                    if self.config.emit_debug_events {
                        events.push(SessionEvent::debug("Audio stream ended"));
                    }
                    events.extend(self.session.stop());
                    self.stop_source().await;
                    self.dispatch(events).await;
                }
                Input::Frame(Err(e)) => {
                    let events = self.session.fail(&e);
                    self.stop_source().await;
                    self.dispatch(events).await;
                }
                Input::Command(Some(command)) => self.handle_command(command).await,
                Input::Command(None) => {}
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) {
        info!("Command: {:?}", command);

        match command {
            Command::StartRecording => self.start_recording().await,
            Command::StopRecording => {
                let events = self.session.stop();
                self.stop_source().await;
                self.dispatch(events).await;
            }
            Command::Shutdown => {
                info!("Shutdown requested by control client");
                self.running.store(false, Ordering::SeqCst);
            }
            Command::Disconnect => self.handle_disconnect().await,
        }
    }

    async fn start_recording(&mut self) {
        if !self.session.is_recording() {
            if let Err(e) = self.source.start().await {
                error!("Failed to start audio source {}: {}", self.source.name(), e);
                let event = SessionEvent::error(format!("Failed to start audio capture: {}", e));
                self.dispatch(vec![event]).await;
                return;
            }
        }

        let events = self.session.start();
        self.dispatch(events).await;
    }

    /// Send events in order; a failed send means the peer is gone
    async fn dispatch(&mut self, events: Vec<SessionEvent>) {
        let mut peer_lost = false;
        for event in &events {
            if !self.channel.send_event(event).await {
                peer_lost = true;
            }
        }

        if peer_lost {
            self.handle_disconnect().await;
        }
    }

    /// Finalize any active recording, then wait for a new peer or stop serving
    async fn handle_disconnect(&mut self) {
        let events = self.session.finalize();
        self.stop_source().await;

        // No peer: these are only logged
        for event in &events {
            self.channel.send_event(event).await;
        }

        loop {
            if !self
                .channel
                .wait_for_reconnect(self.config.reconnect_timeout)
                .await
            {
                if self.running.load(Ordering::SeqCst) {
                    info!(
                        "No reconnection within {:.0}s, shutting down",
                        self.config.reconnect_timeout.as_secs_f64()
                    );
                }
                self.running.store(false, Ordering::SeqCst);
                return;
            }

            if self.channel.send_event(&SessionEvent::ServerReady).await {
                return;
            }
        }
    }

    async fn stop_source(&mut self) {
        if self.source.is_capturing() {
            if let Err(e) = self.source.stop().await {
                warn!("Failed to stop audio source {}: {}", self.source.name(), e);
            }
        }
    }

    async fn shutdown(&mut self) {
        let events = self.session.finalize();
        self.stop_source().await;

        for event in &events {
            self.channel.send_event(event).await;
        }

        self.channel.close().await;
        info!("Server stopped");
    }
}
