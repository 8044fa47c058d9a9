pub mod capture;
pub mod decoder;
#[cfg(feature = "microphone")]
pub mod microphone;
pub mod pcm;
pub mod render;
pub mod wav;

pub use capture::{
    mime_for_path, negotiate_mime_type, wav_chunks, FileCapture, MicrophoneCapture,
    DEFAULT_CHUNK_BYTES, DEFAULT_MIME_PREFERENCES,
};
pub use decoder::{AudioDecoder, DecodedAudio, SymphoniaDecoder, FALLBACK_MIME_TYPE};
#[cfg(feature = "microphone")]
pub use microphone::{CpalCapture, MICROPHONE_MIME_TYPE};
pub use pcm::{quantize, quantize_buffer, Pcm16Buffer};
pub use render::{
    resample, OfflineRenderer, RenderContext, SincRenderer, DEFAULT_MAX_RENDER_FRAMES,
    TARGET_SAMPLE_RATE,
};
pub use wav::{parse_wav, write_wav, WavBlob, WAV_HEADER_LEN, WAV_MIME_TYPE};
