use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: Uuid,

    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the recording started
    pub started_at: DateTime<Utc>,

    /// Time since the recording started, in seconds
    pub duration_secs: f64,

    /// Number of non-empty chunks received so far
    pub chunk_count: usize,

    /// Total compressed bytes received so far
    pub byte_count: usize,

    /// Negotiated codec, if any
    pub mime_type: Option<String>,
}
