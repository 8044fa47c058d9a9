// Offline rendering to the target rate
//
// Rendering is a pure computation over the whole decoded recording: it runs
// as fast as the CPU allows and never touches a clock. Only channel 0 of the
// source is rendered; further channels are discarded, not mixed in.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

use super::decoder::DecodedAudio;
use crate::error::{Error, Result};

/// Sample rate every recording is rendered to
pub const TARGET_SAMPLE_RATE: u32 = 22050;

/// Default render budget: one hour at the target rate
pub const DEFAULT_MAX_RENDER_FRAMES: usize = TARGET_SAMPLE_RATE as usize * 60 * 60;

/// Output description for a single offline render
///
/// Created per pipeline invocation and consumed by [`OfflineRenderer::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    pub sample_rate: u32,
    pub channels: u16,
    /// Output length in frames
    pub length: usize,
}

impl RenderContext {
    /// Mono context of an explicit length
    pub fn new(sample_rate: u32, length: usize) -> Self {
        Self {
            sample_rate,
            channels: 1,
            length,
        }
    }

    /// Mono context long enough to hold `duration_secs` at `sample_rate`
    pub fn for_duration(sample_rate: u32, duration_secs: f64) -> Self {
        let length = (sample_rate as f64 * duration_secs).round().max(0.0) as usize;
        Self::new(sample_rate, length)
    }
}

/// Offline rendering capability
#[async_trait::async_trait]
pub trait OfflineRenderer: Send + Sync {
    /// Render channel 0 of `source` into the mono output described by `context`
    async fn render(&self, context: RenderContext, source: &DecodedAudio) -> Result<Vec<f32>>;

    /// Renderer name for logging
    fn name(&self) -> &str;
}

/// Source frames fed to the resampler per call
const CHUNK_FRAMES: usize = 1024;

/// Renderer backed by rubato's windowed-sinc resampler
///
/// The sinc filter band-limits the signal to the output Nyquist frequency,
/// so content the target rate cannot carry is attenuated instead of folding
/// back into the audible band.
#[derive(Debug, Clone)]
pub struct SincRenderer {
    max_frames: usize,
}

impl SincRenderer {
    pub fn new(max_frames: usize) -> Self {
        Self { max_frames }
    }
}

impl Default for SincRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RENDER_FRAMES)
    }
}

#[async_trait::async_trait]
impl OfflineRenderer for SincRenderer {
    async fn render(&self, context: RenderContext, source: &DecodedAudio) -> Result<Vec<f32>> {
        if context.channels != 1 {
            return Err(Error::Render(format!(
                "Only mono output is supported, context has {} channels",
                context.channels
            )));
        }
        if context.sample_rate == 0 {
            return Err(Error::Render("Context sample rate must be non-zero".to_string()));
        }
        if context.length > self.max_frames {
            return Err(Error::Render(format!(
                "Render of {} frames exceeds budget of {} frames",
                context.length, self.max_frames
            )));
        }

        let input = source
            .channel(0)
            .ok_or_else(|| Error::Render("Source has no channels".to_string()))?
            .to_vec();
        let source_rate = source.sample_rate();

        debug!(
            "Rendering {} frames @ {}Hz -> {} frames @ {}Hz ({} source channels, using channel 0)",
            input.len(),
            source_rate,
            context.length,
            context.sample_rate,
            source.channel_count()
        );

        tokio::task::spawn_blocking(move || {
            resample(&input, source_rate, context.sample_rate, context.length)
        })
        .await
        .map_err(|e| Error::Render(format!("Render task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "sinc"
    }
}

fn create_resampler(source_rate: u32, target_rate: u32) -> Result<SincFixedIn<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    SincFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        1.0,
        params,
        CHUNK_FRAMES,
        1,
    )
    .map_err(|e| Error::Render(format!("Failed to create resampler: {}", e)))
}

/// Resample mono `samples` from `source_rate` to `target_rate`, producing
/// exactly `length` output frames
///
/// The resampler's filter delay is trimmed from the front so output frame 0
/// lines up with input frame 0. Missing frames at the end are silence.
pub fn resample(
    samples: &[f32],
    source_rate: u32,
    target_rate: u32,
    length: usize,
) -> Result<Vec<f32>> {
    if samples.is_empty() {
        return Ok(vec![0.0; length]);
    }

    if source_rate == target_rate {
        let mut output = samples.to_vec();
        output.resize(length, 0.0);
        return Ok(output);
    }

    let mut resampler = create_resampler(source_rate, target_rate)?;
    let delay = resampler.output_delay();
    let wanted = length + delay;
    let mut output = Vec::with_capacity(wanted + CHUNK_FRAMES);

    let mut chunks = samples.chunks_exact(CHUNK_FRAMES);
    for chunk in &mut chunks {
        let rendered = resampler
            .process(&[chunk], None)
            .map_err(|e| Error::Render(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&rendered[0]);
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let rendered = resampler
            .process_partial(Some(&[rest][..]), None)
            .map_err(|e| Error::Render(format!("Resampling failed: {}", e)))?;
        output.extend_from_slice(&rendered[0]);
    }

    // Flush the filter tail
    while output.len() < wanted {
        let rendered = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| Error::Render(format!("Resampling failed: {}", e)))?;
        if rendered[0].is_empty() {
            break;
        }
        output.extend_from_slice(&rendered[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(length, 0.0);

    Ok(output)
}
