// Integration tests for the capture-to-WAV pipeline
//
// These tests run the real symphonia decoder and sinc renderer over
// synthetic recordings and check the produced WAV files.

mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{dominant_frequency, split_chunks, stereo_sine_wav, ScriptedCapture};
use voice_morpher::{
    parse_wav, ConversionPipeline, DecodedAudio, Error, Recorder, RecorderConfig, SincRenderer,
    SymphoniaDecoder, TARGET_SAMPLE_RATE,
};

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
}

fn le_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
}

#[tokio::test]
async fn test_two_second_stereo_capture_end_to_end() -> Result<()> {
    let capture_bytes = stereo_sine_wav(2.0, 44100, 440.0);
    let (capture, log) = ScriptedCapture::new(&["audio/wav"], split_chunks(&capture_bytes, 7));

    let config = RecorderConfig {
        mime_preferences: vec!["audio/webm;codecs=opus".to_string(), "audio/wav".to_string()],
        ..Default::default()
    };
    let mut recorder = Recorder::new(config, Box::new(capture), ConversionPipeline::default());

    recorder.start().await?;
    let wav = recorder.stop().await?.expect("active session produces a blob");

    assert_eq!(log.requested_mime(), Some(Some("audio/wav".to_string())));
    assert_eq!(log.releases(), 1);

    // Header
    let b = wav.as_bytes();
    assert_eq!(&b[0..4], b"RIFF");
    assert_eq!(&b[8..12], b"WAVE");
    assert_eq!(le_u16(b, 20), 1, "PCM");
    assert_eq!(le_u16(b, 22), 1, "mono");
    assert_eq!(le_u32(b, 24), 22050);
    assert_eq!(le_u32(b, 28), 44100);
    assert_eq!(le_u16(b, 34), 16);

    let data_size = le_u32(b, 40) as i64;
    assert!((data_size - 88200).abs() <= 2, "dataSize {}", data_size);
    assert_eq!(le_u32(b, 4) as i64, 36 + data_size);
    assert_eq!(b.len() as i64, 44 + data_size);

    // Content: still a 440 Hz tone at the new rate
    let pcm = parse_wav(b)?;
    assert_eq!(pcm.sample_rate(), TARGET_SAMPLE_RATE);
    let freq = dominant_frequency(pcm.samples(), pcm.sample_rate(), 300.0, 600.0, 2.0);
    assert!((freq - 440.0).abs() <= 4.0, "dominant frequency {}", freq);

    Ok(())
}

#[tokio::test]
async fn test_duration_preserved_across_source_rates() -> Result<()> {
    let pipeline = ConversionPipeline::default();

    for (rate, frames) in [(8000u32, 8000usize), (16000, 24000), (44100, 66150), (48000, 50000)] {
        let audio = DecodedAudio::new(rate, vec![vec![0.1; frames]])?;
        let expected = (22050.0 * audio.duration_seconds()).round() as i64;

        let pcm = parse_wav(pipeline.encode(&audio).await?.as_bytes())?;
        assert!(
            (pcm.len() as i64 - expected).abs() <= 1,
            "{}Hz: expected {} samples, got {}",
            rate,
            expected,
            pcm.len()
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_only_channel_zero_reaches_output() -> Result<()> {
    let frames = 4800;
    let left: Vec<f32> = (0..frames).map(|i| ((i % 48) as f32 / 48.0) - 0.5).collect();
    let right = vec![0.75; frames];

    let pipeline = ConversionPipeline::default();
    let stereo = pipeline
        .encode(&DecodedAudio::new(48000, vec![left.clone(), right])?)
        .await?;
    let mono = pipeline.encode(&DecodedAudio::new(48000, vec![left])?).await?;

    assert_eq!(stereo, mono);

    Ok(())
}

#[tokio::test]
async fn test_empty_capture_fails_with_decode_error() {
    let pipeline = ConversionPipeline::default();

    let err = pipeline.convert(Vec::new(), "audio/webm").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn test_corrupt_capture_fails_with_decode_error() {
    let pipeline = ConversionPipeline::default();

    let garbage = vec![0x42u8; 2048];
    let err = pipeline.convert(garbage, "audio/webm;codecs=opus").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));

    // A WAV header with its data cut off decodes to nothing
    let mut truncated = stereo_sine_wav(0.1, 44100, 440.0);
    truncated.truncate(44);
    let err = pipeline.convert(truncated, "audio/wav").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn test_capture_cut_off_mid_stream_fails_without_output() {
    let pipeline = ConversionPipeline::default();

    let mut capture = stereo_sine_wav(1.0, 44100, 440.0);
    capture.truncate(capture.len() / 2);
    let err = pipeline.convert(capture, "audio/wav").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {:?}", err);

    // Losing only the final frame is still a truncation
    let mut capture = stereo_sine_wav(0.5, 48000, 440.0);
    capture.truncate(capture.len() - 4);
    let err = pipeline.convert(capture, "audio/wav").await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_content_above_output_nyquist_is_attenuated() -> Result<()> {
    let rate = 44100;
    let tone: Vec<f32> = (0..rate as usize)
        .map(|i| (2.0 * std::f32::consts::PI * 15000.0 * i as f32 / rate as f32).sin() * 0.8)
        .collect();

    let pipeline = ConversionPipeline::default();
    let wav = pipeline.encode(&DecodedAudio::new(rate, vec![tone])?).await?;
    let pcm = parse_wav(wav.as_bytes())?;
    assert_eq!(pcm.len(), 22050);

    // Away from the edges, nothing folds back into the audible band
    let peak = pcm.samples()[1000..21000]
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap_or(0);
    assert!(peak < 328, "aliased peak {} (> 1% of full scale)", peak);

    Ok(())
}

#[tokio::test]
async fn test_render_budget_exhaustion_is_render_error() {
    let pipeline = ConversionPipeline::new(
        Arc::new(SymphoniaDecoder::new()),
        Arc::new(SincRenderer::new(1000)),
    );

    let err = pipeline
        .convert(stereo_sine_wav(1.0, 44100, 440.0), "audio/wav")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Render(_)));
}
