use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use super::stats::SessionStats;
use crate::error::{Error, Result};

/// One capture, from `start()` to `stop()`
///
/// Chunks are collected in arrival order by a background task until the
/// capture closes its channel. Zero-length chunks are dropped.
pub struct RecordingSession {
    id: Uuid,
    mime_type: Option<String>,
    started_at: DateTime<Utc>,

    /// Number of chunks collected
    chunk_count: Arc<AtomicUsize>,

    /// Total bytes collected
    byte_count: Arc<AtomicUsize>,

    /// Handle for the chunk collecting task
    collector: JoinHandle<Vec<Vec<u8>>>,
}

impl RecordingSession {
    /// Begin collecting chunks from a started capture
    pub fn begin(mime_type: Option<String>, mut chunk_rx: mpsc::Receiver<Vec<u8>>) -> Self {
        let id = Uuid::new_v4();
        let chunk_count = Arc::new(AtomicUsize::new(0));
        let byte_count = Arc::new(AtomicUsize::new(0));

        let task_chunks = Arc::clone(&chunk_count);
        let task_bytes = Arc::clone(&byte_count);

        let collector = tokio::spawn(async move {
            let mut chunks = Vec::new();

            while let Some(chunk) = chunk_rx.recv().await {
                if chunk.is_empty() {
                    debug!("Dropping zero-length chunk");
                    continue;
                }

                task_bytes.fetch_add(chunk.len(), Ordering::SeqCst);
                task_chunks.fetch_add(1, Ordering::SeqCst);
                chunks.push(chunk);
            }

            chunks
        });

        info!(
            "Recording session {} started ({})",
            id,
            mime_type.as_deref().unwrap_or("platform default format")
        );

        Self {
            id,
            mime_type,
            started_at: Utc::now(),
            chunk_count,
            byte_count,
            collector,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count.load(Ordering::SeqCst)
    }

    pub fn byte_count(&self) -> usize {
        self.byte_count.load(Ordering::SeqCst)
    }

    /// Get current session statistics
    pub fn stats(&self, is_recording: bool) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            session_id: self.id,
            is_recording,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunk_count: self.chunk_count(),
            byte_count: self.byte_count(),
            mime_type: self.mime_type.clone(),
        }
    }

    /// Wait for the capture channel to close and concatenate every chunk
    pub async fn finish(self) -> Result<Vec<u8>> {
        let chunks = self
            .collector
            .await
            .map_err(|e| Error::Capture(format!("Chunk collector failed: {}", e)))?;

        let bytes = chunks.concat();

        info!(
            "Recording session {} finished: {} chunks, {} bytes",
            self.id,
            chunks.len(),
            bytes.len()
        );

        Ok(bytes)
    }
}
