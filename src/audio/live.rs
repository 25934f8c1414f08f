// Microphone capture through cpal
//
// The cpal stream is not Send, so it lives on a dedicated capture thread.
// The device callback re-blocks audio into fixed-size mono frames and hands
// them to the async side over an unbounded channel, so capture never waits
// on the consumer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::frame::{normalize_i16, AudioFrame, FrameAssembler};
use super::source::{AudioFrameSource, SourceConfig};
use crate::error::CaptureError;

type FrameResult = Result<AudioFrame, CaptureError>;

/// Live microphone frame source
pub struct LiveSource {
    device: Option<String>,
    config: SourceConfig,
    frames: Option<mpsc::UnboundedReceiver<FrameResult>>,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl LiveSource {
    pub fn new(device: Option<String>, config: SourceConfig) -> Self {
        Self {
            device,
            config,
            frames: None,
            stop_tx: None,
            thread: None,
        }
    }
}

/// List available input device names
pub fn list_input_devices() -> anyhow::Result<Vec<String>> {
    let host = cpal::default_host();
    Ok(host
        .input_devices()?
        .filter_map(|d| d.name().ok())
        .collect())
}

fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let device = match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::Stream {
                message: format!("Failed to enumerate input devices: {}", e),
            })?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false)),
        None => host.default_input_device(),
    };

    device.ok_or_else(|| CaptureError::DeviceUnavailable {
        device: name.unwrap_or("default").to_string(),
    })
}

fn build_stream(
    device_name: Option<&str>,
    config: &SourceConfig,
    tx: mpsc::UnboundedSender<FrameResult>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = find_device(&host, device_name)?;
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::UnsupportedFormat {
            message: format!("{}: {}", name, e),
        })?;

    let channels = supported.channels();
    let sample_format = supported.sample_format();

    // Ask for the session rate directly; no resampling on our side
    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(
        "Using input device: {} ({}Hz requested, {} ch, {:?})",
        name, config.sample_rate, channels, sample_format
    );

    let err_tx = tx.clone();
    let on_error = move |err: cpal::StreamError| {
        error!("Audio stream error: {}", err);
        let _ = err_tx.send(Err(CaptureError::Stream {
            message: err.to_string(),
        }));
    };

    let mut assembler = FrameAssembler::new(config.frame_size, config.sample_rate, channels);

    let stream = match sample_format {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for frame in assembler.push(data.iter().copied()) {
                    let _ = tx.send(Ok(frame));
                }
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                for frame in assembler.push(normalize_i16(data)) {
                    let _ = tx.send(Ok(frame));
                }
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::UnsupportedFormat {
                message: format!("{}: sample format {:?}", name, other),
            })
        }
    }
    .map_err(|e| CaptureError::UnsupportedFormat {
        message: format!("{}: {}", name, e),
    })?;

    stream.play().map_err(|e| CaptureError::Stream {
        message: e.to_string(),
    })?;

    Ok(stream)
}

#[async_trait::async_trait]
impl AudioFrameSource for LiveSource {
    async fn start(&mut self) -> Result<(), CaptureError> {
        if self.frames.is_some() {
            warn!("Live source already capturing");
            return Ok(());
        }

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let device = self.device.clone();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let stream = match build_stream(device.as_deref(), &config, frame_tx) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Hold the stream until stop() or the source is dropped
                let _ = stop_rx.recv();
                drop(stream);
                info!("Microphone stream released");
            })
            .map_err(|e| CaptureError::Stream {
                message: format!("Failed to spawn capture thread: {}", e),
            })?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                return Err(CaptureError::Stream {
                    message: "capture thread exited during startup".to_string(),
                })
            }
        }

        self.frames = Some(frame_rx);
        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<AudioFrame>, CaptureError> {
        let Some(frames) = self.frames.as_mut() else {
            return Err(CaptureError::NotStarted {
                source_name: "microphone".to_string(),
            });
        };

        match frames.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Err(CaptureError::Stream {
                message: "capture thread ended".to_string(),
            }),
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.frames = None;
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|e| CaptureError::Stream {
                    message: format!("Failed to join capture thread: {}", e),
                })?
                .map_err(|_| CaptureError::Stream {
                    message: "capture thread panicked".to_string(),
                })?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.frames.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for LiveSource {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}
