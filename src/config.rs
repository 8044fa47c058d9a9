use std::path::PathBuf;

use serde::Deserialize;

use crate::audio::{DEFAULT_CHUNK_BYTES, DEFAULT_MAX_RENDER_FRAMES, TARGET_SAMPLE_RATE};
use crate::error::Result;
use crate::session::RecorderConfig;

/// Environment prefix for overrides, e.g. `VOICE_MORPHER__REMOTE__BASE_URL`
pub const ENV_PREFIX: &str = "VOICE_MORPHER";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub recorder: RecorderConfig,
    pub capture: CaptureConfig,
    pub render: RenderConfig,
    pub remote: RemoteConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voice-morpher".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Size of chunks emitted by file capture
    pub chunk_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Longest recording the renderer accepts, in seconds
    pub max_seconds: u64,
}

impl RenderConfig {
    pub fn max_frames(&self) -> usize {
        (self.max_seconds as usize).saturating_mul(TARGET_SAMPLE_RATE as usize)
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_seconds: (DEFAULT_MAX_RENDER_FRAMES / TARGET_SAMPLE_RATE as usize) as u64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for saved recordings
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load the optional config file at `path`, then environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
