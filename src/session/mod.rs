//! Recording session management
//!
//! This module provides the `Recorder`, which owns the capture device and
//! drives one `RecordingSession` at a time:
//! - Codec negotiation against an ordered preference list
//! - Chunk collection while recording
//! - Device release and capture-to-WAV conversion on stop

mod config;
mod recorder;
mod session;
mod stats;

pub use config::{DoubleStartPolicy, RecorderConfig};
pub use recorder::{Recorder, RecorderState};
pub use session::RecordingSession;
pub use stats::SessionStats;
