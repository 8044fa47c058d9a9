use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::{DoubleStartPolicy, RecorderConfig};
use super::session::RecordingSession;
use super::stats::SessionStats;
use crate::audio::{negotiate_mime_type, MicrophoneCapture, WavBlob, FALLBACK_MIME_TYPE};
use crate::error::{Error, Result};
use crate::pipeline::ConversionPipeline;

/// Recorder lifecycle: `Idle -> Recording -> Stopping -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopping,
}

/// Releases the capture device when dropped, whatever path the stop takes
struct ReleaseGuard<'a> {
    capture: &'a mut dyn MicrophoneCapture,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        self.capture.release();
        debug!("Released {} capture", self.capture.name());
    }
}

/// Returns the recorder to idle when a stop ends, however it ends
struct IdleOnDrop<'a>(&'a mut RecorderState);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *self.0 = RecorderState::Idle;
    }
}

/// Owns the capture device and turns each recording into a WAV blob
pub struct Recorder {
    config: RecorderConfig,
    capture: Box<dyn MicrophoneCapture>,
    pipeline: ConversionPipeline,
    state: RecorderState,
    session: Option<RecordingSession>,
}

impl Recorder {
    pub fn new(
        config: RecorderConfig,
        capture: Box<dyn MicrophoneCapture>,
        pipeline: ConversionPipeline,
    ) -> Self {
        info!(
            "Recorder initialized: capture={}, {} preferred formats, double start={:?}",
            capture.name(),
            config.mime_preferences.len(),
            config.double_start
        );

        Self {
            config,
            capture,
            pipeline,
            state: RecorderState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Get statistics for the active session
    pub fn stats(&self) -> Option<SessionStats> {
        self.session
            .as_ref()
            .map(|s| s.stats(self.state == RecorderState::Recording))
    }

    /// Start recording
    ///
    /// Returns the new session's id. Fails with [`Error::Permission`] if the
    /// device cannot be acquired; the recorder then stays idle.
    pub async fn start(&mut self) -> Result<Uuid> {
        if let Some(session) = &self.session {
            return match self.config.double_start {
                DoubleStartPolicy::Reject => Err(Error::AlreadyRecording),
                DoubleStartPolicy::Ignore => {
                    warn!("Recording already started: {}", session.id());
                    Ok(session.id())
                }
            };
        }

        let mime_type = negotiate_mime_type(&self.config.mime_preferences, &*self.capture);

        let chunk_rx = match self.capture.start(mime_type.as_deref()).await {
            Ok(rx) => rx,
            Err(e) => {
                error!("Failed to start {} capture: {}", self.capture.name(), e);
                self.capture.release();
                return Err(e);
            }
        };

        let session = RecordingSession::begin(mime_type, chunk_rx);
        let id = session.id();

        self.session = Some(session);
        self.state = RecorderState::Recording;

        Ok(id)
    }

    /// Stop recording and convert the capture to WAV
    ///
    /// Returns `Ok(None)` when no session is active. The capture device is
    /// released before conversion starts, including when stopping fails or
    /// the returned future is dropped early.
    pub async fn stop(&mut self) -> Result<Option<WavBlob>> {
        let Some(session) = self.session.take() else {
            debug!("stop() called while idle");
            return Ok(None);
        };

        info!("Stopping recording session: {}", session.id());

        let Recorder {
            capture,
            pipeline,
            state,
            ..
        } = self;
        *state = RecorderState::Stopping;
        let _idle = IdleOnDrop(state);

        let result = finalize(&mut **capture, pipeline, session).await;

        match &result {
            Ok(wav) => info!("Recording converted: {} bytes of WAV", wav.len()),
            Err(e) => error!("Recording failed: {}", e),
        }

        result.map(Some)
    }
}

async fn finalize(
    capture: &mut dyn MicrophoneCapture,
    pipeline: &ConversionPipeline,
    session: RecordingSession,
) -> Result<WavBlob> {
    let mime_type = session
        .mime_type()
        .unwrap_or(FALLBACK_MIME_TYPE)
        .to_string();

    let bytes = {
        let guard = ReleaseGuard { capture };
        guard.capture.stop().await?;
        session.finish().await?
    };

    pipeline.convert(bytes, &mime_type).await
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("Recorder dropped while recording; releasing capture");
            self.capture.release();
        }
    }
}
