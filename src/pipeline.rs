//! Capture-to-WAV conversion
//!
//! One-shot chain run when a recording stops:
//!
//! ```text
//! compressed bytes → AudioDecoder → OfflineRenderer (22050 Hz, channel 0)
//!                  → quantize (i16) → write_wav → WavBlob
//! ```
//!
//! Each stage waits for its predecessor's complete output. Any failure ends
//! the chain and no blob is produced.

use std::sync::Arc;

use tracing::info;

use crate::audio::{
    quantize_buffer, write_wav, AudioDecoder, DecodedAudio, OfflineRenderer, RenderContext,
    SincRenderer, SymphoniaDecoder, WavBlob, TARGET_SAMPLE_RATE,
};
use crate::error::Result;

/// Decode → render → quantize → encode, with injectable decode and render stages
#[derive(Clone)]
pub struct ConversionPipeline {
    decoder: Arc<dyn AudioDecoder>,
    renderer: Arc<dyn OfflineRenderer>,
    target_sample_rate: u32,
}

impl ConversionPipeline {
    pub fn new(decoder: Arc<dyn AudioDecoder>, renderer: Arc<dyn OfflineRenderer>) -> Self {
        Self {
            decoder,
            renderer,
            target_sample_rate: TARGET_SAMPLE_RATE,
        }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Convert a complete compressed recording to WAV
    pub async fn convert(&self, bytes: Vec<u8>, mime_type: &str) -> Result<WavBlob> {
        info!(
            "Converting {} bytes of {} with {} decoder",
            bytes.len(),
            mime_type,
            self.decoder.name()
        );

        let decoded = self.decoder.decode(bytes, mime_type).await?;
        self.encode(&decoded).await
    }

    /// Render, quantize and encode already-decoded audio
    pub async fn encode(&self, decoded: &DecodedAudio) -> Result<WavBlob> {
        let context = RenderContext::for_duration(self.target_sample_rate, decoded.duration_seconds());
        let rendered = self.renderer.render(context, decoded).await?;

        let pcm = quantize_buffer(&rendered, self.target_sample_rate);
        let wav = write_wav(&pcm)?;

        info!(
            "Encoded {:.2}s @ {}Hz mono ({} samples, {} bytes) via {} renderer",
            pcm.duration_seconds(),
            pcm.sample_rate(),
            pcm.len(),
            wav.len(),
            self.renderer.name()
        );

        Ok(wav)
    }
}

impl Default for ConversionPipeline {
    fn default() -> Self {
        Self::new(
            Arc::new(SymphoniaDecoder::new()),
            Arc::new(SincRenderer::default()),
        )
    }
}
