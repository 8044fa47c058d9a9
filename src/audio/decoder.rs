//! Container decoding
//!
//! Turns the concatenated compressed chunks of a recording into planar f32
//! PCM at the source's native rate and channel layout.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::{debug, info, warn};

use super::capture::mime_essence;
use crate::error::{Error, Result};

/// Mime type assumed when the recorder could not negotiate one
pub const FALLBACK_MIME_TYPE: &str = "audio/webm";

/// Decoded PCM, one sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// All channels must be the same length; at least one channel is required.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::Decode("Sample rate must be non-zero".to_string()));
        }
        let Some(first) = channels.first() else {
            return Err(Error::Decode("Decoded audio has no channels".to_string()));
        };
        let frames = first.len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(Error::Decode(
                "Decoded channels have different lengths".to_string(),
            ));
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }
}

/// Container/codec decoding capability
#[async_trait::async_trait]
pub trait AudioDecoder: Send + Sync {
    /// Decode a complete compressed recording
    async fn decode(&self, bytes: Vec<u8>, mime_type: &str) -> Result<DecodedAudio>;

    /// Decoder name for logging
    fn name(&self) -> &str;
}

/// Decoder backed by symphonia's default format and codec registries
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AudioDecoder for SymphoniaDecoder {
    async fn decode(&self, bytes: Vec<u8>, mime_type: &str) -> Result<DecodedAudio> {
        let mime_type = mime_type.to_string();
        tokio::task::spawn_blocking(move || decode_bytes(bytes, &mime_type))
            .await
            .map_err(|e| Error::Decode(format!("Decode task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "symphonia"
    }
}

/// File extension symphonia should try first for a mime type
fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
    match mime_essence(mime_type).as_str() {
        "audio/webm" | "video/webm" => Some("webm"),
        "audio/mp4" | "video/mp4" | "audio/m4a" | "audio/x-m4a" => Some("mp4"),
        "audio/ogg" | "application/ogg" => Some("ogg"),
        "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/aac" => Some("aac"),
        _ => None,
    }
}

/// Declared stream length in frames at `sample_rate`
///
/// Containers state the length in their own time base (Matroska in
/// timestamp-scale ticks, MP4 in media timescale units), not always in frames.
fn declared_frames(length: u64, time_base: Option<TimeBase>, sample_rate: u32) -> u64 {
    match time_base {
        Some(tb) if tb.numer > 0 && tb.denom > 0 && (tb.numer, tb.denom) != (1, sample_rate) => {
            let time = tb.calc_time(length);
            ((time.seconds as f64 + time.frac) * sample_rate as f64).floor() as u64
        }
        _ => length,
    }
}

fn decode_bytes(bytes: Vec<u8>, mime_type: &str) -> Result<DecodedAudio> {
    if bytes.is_empty() {
        return Err(Error::Decode("Empty capture".to_string()));
    }

    debug!("Decoding {} bytes as {}", bytes.len(), mime_type);

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(mime_type);
    if let Some(ext) = extension_for_mime(mime_type) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let declared = track.codec_params.n_frames;
    let time_base = track.codec_params.time_base;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Unsupported codec: {}", e)))?;

    let mut channels: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(Error::Decode(format!("Failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                return Err(Error::Decode(format!("Corrupt packet: {}", e)));
            }
            Err(e) => return Err(Error::Decode(format!("Decoder failed: {}", e))),
        };

        let spec = *decoded.spec();
        let channel_count = spec.channels.count();
        if channel_count == 0 {
            continue;
        }

        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        } else if channels.len() != channel_count {
            return Err(Error::Decode(format!(
                "Channel layout changed mid-stream ({} -> {})",
                channels.len(),
                channel_count
            )));
        }
        sample_rate.get_or_insert(spec.rate);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        for frame in buf.samples().chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
    }

    let frames = channels.first().map(Vec::len).unwrap_or(0);
    if frames == 0 {
        return Err(Error::Decode("No audio frames decoded".to_string()));
    }

    let sample_rate =
        sample_rate.ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

    // A stream that ends before its declared length was cut off mid-capture
    if let Some(expected) = declared.map(|n| declared_frames(n, time_base, sample_rate)) {
        if (frames as u64) < expected {
            warn!("Stream truncated: {} of {} frames", frames, expected);
            return Err(Error::Decode(format!(
                "Truncated stream: decoded {} of {} declared frames",
                frames, expected
            )));
        }
    }

    let audio = DecodedAudio::new(sample_rate, channels)?;

    info!(
        "Decoded {:.2}s, {}Hz, {} channels ({} frames)",
        audio.duration_seconds(),
        audio.sample_rate(),
        audio.channel_count(),
        audio.frames()
    );

    Ok(audio)
}
