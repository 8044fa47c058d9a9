//! Client for the remote voice-effect service
//!
//! The service is an external collaborator of the recorder:
//! - GET /api/effects - Effect catalog (`[{id, name}]`)
//! - POST /api/process-audio - Multipart `audio` (WAV) + `effect`, returns audio
//!
//! Nothing here is retried, and a failing service never affects recording.

pub mod client;
pub mod messages;

pub use client::{BackendStatus, MorphClient};
pub use messages::{Effect, ErrorResponse};

/// Filename of the WAV part in the upload
pub const UPLOAD_FILENAME: &str = "recording.wav";

/// Download name of the local recording
pub const ORIGINAL_FILENAME: &str = "original_recording.wav";

/// Download name of the transformed recording
pub const MORPHED_FILENAME: &str = "morphed_voice.wav";
