//! Live microphone capture through cpal
//!
//! The cpal stream lives on its own thread for the whole session, since a
//! stream handle cannot move between threads on every platform. Samples are
//! quantized in the device callback and buffered on that thread. The final
//! RIFF sizes are only known once the stream stops, so the WAV-framed chunks
//! are handed over when `stop` flushes the capture.

use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::capture::{mime_essence, wav_chunks, MicrophoneCapture, DEFAULT_CHUNK_BYTES};
use super::pcm::quantize;
use crate::error::{Error, Result};

/// Format of every chunk stream a [`CpalCapture`] produces
pub const MICROPHONE_MIME_TYPE: &str = "audio/wav";

enum Control {
    /// Stop the stream and emit the recording
    Flush,
    /// Stop the stream and drop the recording
    Discard,
}

/// Capture from the system default input device
pub struct CpalCapture {
    chunk_bytes: usize,
    control: Option<std_mpsc::Sender<Control>>,
    device_thread: Option<JoinHandle<()>>,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self::with_chunk_bytes(DEFAULT_CHUNK_BYTES)
    }

    pub fn with_chunk_bytes(chunk_bytes: usize) -> Self {
        Self {
            chunk_bytes: chunk_bytes.max(1),
            control: None,
            device_thread: None,
        }
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MicrophoneCapture for CpalCapture {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_essence(mime_type) == MICROPHONE_MIME_TYPE
    }

    async fn start(&mut self, mime_type: Option<&str>) -> Result<mpsc::Receiver<Vec<u8>>> {
        if self.control.is_some() {
            return Err(Error::Capture("Already capturing".to_string()));
        }

        if let Some(requested) = mime_type.filter(|m| !self.is_type_supported(m)) {
            warn!(
                "Microphone records {}, ignoring requested {}",
                MICROPHONE_MIME_TYPE, requested
            );
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (control_tx, control_rx) = std_mpsc::channel();
        let chunk_bytes = self.chunk_bytes;

        let handle = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || run_device(chunk_bytes, ready_tx, control_rx, chunk_tx))
            .map_err(|e| Error::Capture(format!("Failed to spawn device thread: {}", e)))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(Error::Capture(
                    "Device thread exited before the stream started".to_string(),
                ))
            }
        }

        self.control = Some(control_tx);
        self.device_thread = Some(handle);

        info!("Microphone capture started");

        Ok(chunk_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(control) = self.control.take() else {
            return Ok(());
        };

        // A failed send means the thread is already gone; join reports why
        let _ = control.send(Control::Flush);

        if let Some(handle) = self.device_thread.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| Error::Capture(format!("Join task failed: {}", e)))?
                .map_err(|_| Error::Capture("Microphone thread panicked".to_string()))?;
        }

        info!("Microphone capture stopped");

        Ok(())
    }

    fn release(&mut self) {
        if let Some(control) = self.control.take() {
            let _ = control.send(Control::Discard);
        }
        // The thread exits on its own once the stream is dropped
        self.device_thread.take();
        debug!("Microphone released");
    }

    fn is_capturing(&self) -> bool {
        self.control.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Body of the device thread: own the stream until told to stop
fn run_device(
    chunk_bytes: usize,
    ready: oneshot::Sender<Result<()>>,
    control: std_mpsc::Receiver<Control>,
    chunks: mpsc::Sender<Vec<u8>>,
) {
    let buffer = Arc::new(Mutex::new(Vec::<i16>::new()));

    let (stream, sample_rate, channels) = match open_stream(Arc::clone(&buffer)) {
        Ok(opened) => opened,
        Err(e) => {
            error!("Failed to open microphone: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        return;
    }

    // A dropped sender counts as a discard
    let flush = matches!(control.recv(), Ok(Control::Flush));
    drop(stream);

    if !flush {
        debug!("Discarding microphone recording");
        return;
    }

    let samples = buffer
        .lock()
        .map(|mut b| std::mem::take(&mut *b))
        .unwrap_or_default();

    debug!(
        "Framing {} samples @ {}Hz x {} channels",
        samples.len(),
        sample_rate,
        channels
    );

    match wav_chunks(&samples, sample_rate, channels, chunk_bytes) {
        Ok(framed) => {
            for chunk in framed {
                if chunks.blocking_send(chunk).is_err() {
                    warn!("Chunk receiver dropped, discarding rest of recording");
                    break;
                }
            }
        }
        Err(e) => error!("Failed to frame microphone recording: {}", e),
    }
}

/// Open and start the default input stream, appending quantized samples to `buffer`
fn open_stream(buffer: Arc<Mutex<Vec<i16>>>) -> Result<(cpal::Stream, u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| Error::Permission("No input device available".to_string()))?;

    let supported = device
        .default_input_config()
        .map_err(|e| Error::Permission(format!("Cannot query input device: {}", e)))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: cpal::StreamConfig = supported.into();

    info!(
        "Opening input device {} ({}Hz, {} channels)",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        sample_rate,
        channels
    );

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend(data.iter().map(|&s| quantize(s)));
                }
            },
            |err: cpal::StreamError| {
                error!("Input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| Error::Permission(format!("Cannot open input stream: {}", e)))?;

    stream
        .play()
        .map_err(|e| Error::Permission(format!("Cannot start input stream: {}", e)))?;

    Ok((stream, sample_rate, channels))
}
