use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::protocol::{encode_event, parse_command, Command};
use crate::session::SessionEvent;

/// Longest accepted command line; anything longer is discarded
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// How often a pending accept re-checks the running flag
const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// The one connected peer
struct ClientConnection {
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Bytes of a line not yet terminated by `\n`
    pending: Vec<u8>,
    /// Skipping the rest of an oversized line
    discarding: bool,
}

/// Single-peer, newline-delimited JSON control channel over TCP
pub struct ControlChannel {
    listener: TcpListener,
    client: Option<ClientConnection>,
    /// Cleared to abandon any wait for a peer
    running: Option<Arc<AtomicBool>>,
}

impl ControlChannel {
    /// Bind the listening socket. Failure here is the only fatal error.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind control channel on {}", addr))?;

        info!("Control channel listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            client: None,
            running: None,
        })
    }

    /// Abandon client waits as soon as `running` is cleared
    pub fn set_running_flag(&mut self, running: Arc<AtomicBool>) {
        self.running = Some(running);
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map_or(true, |running| running.load(Ordering::SeqCst))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read control channel address")
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.client.as_ref().map(|c| c.peer)
    }

    /// Wait up to `timeout` for a peer. Returns true if one is connected.
    pub async fn wait_for_client(&mut self, timeout: Duration) -> bool {
        if self.client.is_some() {
            return true;
        }

        info!(
            "Waiting up to {:.0}s for a control client",
            timeout.as_secs_f64()
        );

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.is_running() {
                info!("Stopped waiting for a control client: shutting down");
                return false;
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                info!("No control client connected within {:.0}s", timeout.as_secs_f64());
                return false;
            }
            let step = ACCEPT_POLL.min(deadline - now);

            match tokio::time::timeout(step, self.listener.accept()).await {
                Ok(Ok((stream, peer))) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY for {}: {}", peer, e);
                    }
                    let (read_half, write_half) = stream.into_split();
                    self.client = Some(ClientConnection {
                        peer,
                        reader: BufReader::new(read_half),
                        writer: write_half,
                        pending: Vec::new(),
                        discarding: false,
                    });
                    info!("Control client connected: {}", peer);
                    return true;
                }
                Ok(Err(e)) => {
                    warn!("Failed to accept control client: {}", e);
                    return false;
                }
                Err(_) => continue,
            }
        }
    }

    /// Drop the current peer (if any) and wait for a new one
    pub async fn wait_for_reconnect(&mut self, timeout: Duration) -> bool {
        if let Some(client) = self.client.take() {
            debug!("Releasing control client {}", client.peer);
        }
        self.wait_for_client(timeout).await
    }

    /// Send one event. Returns false if the peer is gone; with no peer
    /// connected the event is only logged and the send counts as delivered.
    pub async fn send_event(&mut self, event: &SessionEvent) -> bool {
        let line = encode_event(event);

        let Some(client) = self.client.as_mut() else {
            debug!("No control client, event not sent: {}", line.trim_end());
            return true;
        };

        match client.writer.write_all(line.as_bytes()).await {
            Ok(()) => {
                debug!("Sent event to {}: {}", client.peer, event.kind());
                true
            }
            Err(e) => {
                warn!("Failed to send {} event to {}: {}", event.kind(), client.peer, e);
                self.client = None;
                false
            }
        }
    }

    /// Poll for one command for at most `timeout`
    ///
    /// End of stream (or a read error) drops the peer and yields
    /// `Command::Disconnect`. Malformed lines and lines longer than
    /// [`MAX_LINE_BYTES`] are discarded. Additional connections arriving
    /// while a peer is active are refused.
    pub async fn receive_command(&mut self, timeout: Duration) -> Option<Command> {
        let Self {
            listener, client, ..
        } = self;

        let Some(conn) = client.as_mut() else {
            tokio::time::sleep(timeout).await;
            return None;
        };

        let peer = conn.peer;
        let limit = (MAX_LINE_BYTES - conn.pending.len()) as u64;
        let mut limited = (&mut conn.reader).take(limit);
        let read = tokio::select! {
            // Pending data (or EOF) from the current peer comes first
            biased;
            read = tokio::time::timeout(timeout, limited.read_until(b'\n', &mut conn.pending)) => read,
            accepted = listener.accept() => {
                if let Ok((_, extra)) = accepted {
                    warn!("Refusing control connection from {}: {} is already connected", extra, peer);
                }
                return None;
            }
        };

        match read {
            // Timed out; any partial line stays in `pending`
            Err(_) => None,
            Ok(Ok(0)) => {
                info!("Control client disconnected: {}", peer);
                *client = None;
                Some(Command::Disconnect)
            }
            Ok(Ok(_)) => {
                if !conn.pending.ends_with(b"\n") && conn.pending.len() >= MAX_LINE_BYTES {
                    if !conn.discarding {
                        warn!(
                            "Discarding control line from {}: longer than {} bytes",
                            peer, MAX_LINE_BYTES
                        );
                    }
                    conn.pending.clear();
                    conn.discarding = true;
                    return None;
                }

                let line = std::mem::take(&mut conn.pending);
                if std::mem::take(&mut conn.discarding) {
                    // Tail of an oversized line
                    return None;
                }
                let text = String::from_utf8_lossy(&line);
                let command = parse_command(&text);
                if let Some(command) = command {
                    debug!("Received command from {}: {:?}", peer, command);
                }
                command
            }
            Ok(Err(e)) => {
                warn!("Control connection error from {}: {}", peer, e);
                *client = None;
                Some(Command::Disconnect)
            }
        }
    }

    /// Close the peer connection, if any
    pub async fn close(&mut self) {
        if let Some(mut client) = self.client.take() {
            if let Err(e) = client.writer.shutdown().await {
                debug!("Error closing control connection: {}", e);
            }
            info!("Control connection to {} closed", client.peer);
        }
    }
}
