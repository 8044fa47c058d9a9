pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod remote;
pub mod session;

pub use audio::{
    parse_wav, quantize, write_wav, AudioDecoder, DecodedAudio, FileCapture, MicrophoneCapture,
    OfflineRenderer, Pcm16Buffer, RenderContext, SincRenderer, SymphoniaDecoder, WavBlob,
    TARGET_SAMPLE_RATE,
};
#[cfg(feature = "microphone")]
pub use audio::CpalCapture;
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::ConversionPipeline;
pub use remote::{BackendStatus, Effect, MorphClient};
pub use session::{
    DoubleStartPolicy, Recorder, RecorderConfig, RecorderState, RecordingSession, SessionStats,
};
