use serde::{Deserialize, Serialize};

use crate::audio::DEFAULT_MIME_PREFERENCES;

/// What `start()` does while a session is already recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoubleStartPolicy {
    /// Fail with `Error::AlreadyRecording`
    #[default]
    Reject,
    /// Log a warning and keep the current session
    Ignore,
}

/// Configuration for the recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Codec preference order, most preferred first
    pub mime_preferences: Vec<String>,

    /// Behaviour of a second `start()` during a recording
    pub double_start: DoubleStartPolicy,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            mime_preferences: DEFAULT_MIME_PREFERENCES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            double_start: DoubleStartPolicy::Reject,
        }
    }
}
