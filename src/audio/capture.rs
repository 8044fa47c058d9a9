use std::io::Cursor;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Codec preference order used when none is configured
pub const DEFAULT_MIME_PREFERENCES: &[&str] = &["audio/webm;codecs=opus", "audio/webm", "audio/mp4"];

/// Default size of the chunks a [`FileCapture`] emits
pub const DEFAULT_CHUNK_BYTES: usize = 16 * 1024;

/// Microphone capture capability
///
/// A capture produces compressed chunks on the returned channel while active.
/// `stop` flushes any pending data and closes the channel; `release` frees the
/// underlying device and must be safe to call more than once.
#[async_trait::async_trait]
pub trait MicrophoneCapture: Send + Sync {
    /// Whether the platform can record in this mime type
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Acquire the device and start producing chunks
    ///
    /// `None` means "platform default format". Fails with
    /// [`Error::Permission`] when the device is denied or unavailable.
    async fn start(&mut self, mime_type: Option<&str>) -> Result<mpsc::Receiver<Vec<u8>>>;

    /// Stop producing chunks; the channel closes after the last one
    async fn stop(&mut self) -> Result<()>;

    /// Release the device
    fn release(&mut self);

    /// Check if capture is currently running
    fn is_capturing(&self) -> bool;

    /// Get capture name for logging
    fn name(&self) -> &str;
}

/// Pick the first preferred mime type the capture supports
pub fn negotiate_mime_type<S: AsRef<str>>(
    preferences: &[S],
    capture: &dyn MicrophoneCapture,
) -> Option<String> {
    let chosen = preferences
        .iter()
        .map(AsRef::as_ref)
        .find(|mime| capture.is_type_supported(mime))
        .map(str::to_string);

    match &chosen {
        Some(mime) => debug!("{} negotiated {}", capture.name(), mime),
        None => warn!(
            "{} supports none of {} preferred types, using platform default",
            capture.name(),
            preferences.len()
        ),
    }

    chosen
}

/// Part of a mime type before any parameters, lowercased
pub(crate) fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Mime type implied by an audio file's extension
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "webm" => Some("audio/webm"),
        "mp4" | "m4a" => Some("audio/mp4"),
        "ogg" | "oga" | "opus" => Some("audio/ogg"),
        "wav" | "wave" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

/// Frame interleaved 16-bit PCM as a WAV stream split into `chunk_bytes` chunks
///
/// The first chunk starts with the RIFF header, so the chunks concatenate
/// back into one complete WAV file.
pub fn wav_chunks(
    samples: &[i16],
    sample_rate: u32,
    channels: u16,
    chunk_bytes: usize,
) -> Result<Vec<Vec<u8>>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Capture(format!("Failed to frame capture: {}", e)))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Capture(format!("Failed to frame capture: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| Error::Capture(format!("Failed to frame capture: {}", e)))?;
    }

    Ok(cursor
        .into_inner()
        .chunks(chunk_bytes.max(1))
        .map(<[u8]>::to_vec)
        .collect())
}

/// Capture that "records" an existing audio file
///
/// The file is read when capture starts and streamed out in fixed-size chunks,
/// the same way a platform recorder hands over compressed data.
pub struct FileCapture {
    path: PathBuf,
    chunk_bytes: usize,
    reader: Option<JoinHandle<()>>,
    capturing: bool,
}

impl FileCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_chunk_bytes(path, DEFAULT_CHUNK_BYTES)
    }

    pub fn with_chunk_bytes(path: impl Into<PathBuf>, chunk_bytes: usize) -> Self {
        Self {
            path: path.into(),
            chunk_bytes: chunk_bytes.max(1),
            reader: None,
            capturing: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl MicrophoneCapture for FileCapture {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_for_path(&self.path).is_some_and(|own| mime_essence(mime_type) == own)
    }

    async fn start(&mut self, mime_type: Option<&str>) -> Result<mpsc::Receiver<Vec<u8>>> {
        if self.capturing {
            return Err(Error::Capture("Already capturing".to_string()));
        }

        let data = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::Permission(format!("Cannot open {}: {}", self.path.display(), e))
        })?;

        info!(
            "Starting file capture: {} ({} bytes, format {})",
            self.path.display(),
            data.len(),
            mime_type.unwrap_or("default")
        );

        let (tx, rx) = mpsc::channel(64);
        let chunk_bytes = self.chunk_bytes;

        self.reader = Some(tokio::spawn(async move {
            for chunk in data.chunks(chunk_bytes) {
                if tx.send(chunk.to_vec()).await.is_err() {
                    warn!("Chunk receiver dropped, ending file capture early");
                    break;
                }
            }
        }));
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        if let Some(reader) = self.reader.take() {
            reader
                .await
                .map_err(|e| Error::Capture(format!("File reader task failed: {}", e)))?;
        }
        self.capturing = false;

        info!("File capture stopped");

        Ok(())
    }

    fn release(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.capturing = false;
        debug!("File capture released: {}", self.path.display());
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}
