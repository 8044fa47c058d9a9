//! Error types for voice-morpher
//!
//! Pipeline failures (capture, decode, render) are kept apart from failures of
//! the remote effect service so callers can report them differently.

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Microphone access denied or capture device unavailable
    #[error("Microphone unavailable: {0}")]
    Permission(String),

    /// `start()` called while a session is active under the reject policy
    #[error("A recording session is already active")]
    AlreadyRecording,

    /// Capture device failed while stopping or flushing its data
    #[error("Capture error: {0}")]
    Capture(String),

    /// Captured bytes are not a decodable audio container
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Offline rendering (resampling to the target rate) failed
    #[error("Render error: {0}")]
    Render(String),

    /// Malformed or unsupported WAV input
    #[error("WAV error: {0}")]
    Wav(String),

    /// Remote effect service unreachable or returned a non-2xx status
    #[error("Remote service error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of the local capture-to-WAV pipeline.
    pub fn is_pipeline(&self) -> bool {
        matches!(self, Error::Capture(_) | Error::Decode(_) | Error::Render(_))
    }

    /// True for failures of the remote effect service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Remote {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

/// Convenience Result type using the crate Error
pub type Result<T> = std::result::Result<T, Error>;
