// Shared fakes and signal helpers for integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use voice_morpher::{Error, MicrophoneCapture, Result};

/// Observations a test can make on a [`ScriptedCapture`] after handing it away
#[derive(Clone, Default)]
pub struct CaptureLog {
    pub starts: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
    pub requested_mime: Arc<Mutex<Option<Option<String>>>>,
}

impl CaptureLog {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn requested_mime(&self) -> Option<Option<String>> {
        self.requested_mime.lock().unwrap().clone()
    }
}

/// Capture that replays a fixed list of chunks each time it is started
pub struct ScriptedCapture {
    supported: Vec<String>,
    chunks: Vec<Vec<u8>>,
    deny: bool,
    hang_on_stop: bool,
    log: CaptureLog,
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

impl ScriptedCapture {
    pub fn new(supported: &[&str], chunks: Vec<Vec<u8>>) -> (Self, CaptureLog) {
        let log = CaptureLog::default();
        let capture = Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            chunks,
            deny: false,
            hang_on_stop: false,
            log: log.clone(),
            tx: None,
        };
        (capture, log)
    }

    /// Capture whose device access is always denied
    pub fn denied() -> (Self, CaptureLog) {
        let (mut capture, log) = Self::new(&[], Vec::new());
        capture.deny = true;
        (capture, log)
    }

    /// Capture whose `stop` never completes
    pub fn hanging() -> (Self, CaptureLog) {
        let (mut capture, log) = Self::new(&[], Vec::new());
        capture.hang_on_stop = true;
        (capture, log)
    }
}

#[async_trait::async_trait]
impl MicrophoneCapture for ScriptedCapture {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|m| m == mime_type)
    }

    async fn start(&mut self, mime_type: Option<&str>) -> Result<mpsc::Receiver<Vec<u8>>> {
        *self.log.requested_mime.lock().unwrap() = Some(mime_type.map(str::to_string));

        if self.deny {
            return Err(Error::Permission("Permission denied by user".to_string()));
        }

        self.log.starts.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(self.chunks.len() + 1);
        for chunk in &self.chunks {
            tx.send(chunk.clone()).await.expect("receiver alive");
        }
        self.tx = Some(tx);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.hang_on_stop {
            std::future::pending::<()>().await;
        }
        self.tx.take();
        Ok(())
    }

    fn release(&mut self) {
        self.tx.take();
        self.log.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Split bytes into `count` roughly equal chunks
pub fn split_chunks(bytes: &[u8], count: usize) -> Vec<Vec<u8>> {
    let size = bytes.len().div_ceil(count.max(1)).max(1);
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

/// Stereo 16-bit WAV: channel 0 is a sine at `freq`, channel 1 is silence
pub fn stereo_sine_wav(seconds: f64, sample_rate: u32, freq: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let frames = (seconds * sample_rate as f64).round() as usize;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let t = i as f64 / sample_rate as f64;
            let s = (2.0 * std::f64::consts::PI * freq * t).sin() * 0.8;
            writer.write_sample((s * 32767.0) as i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Frequency (in `step` Hz bins between `lo` and `hi`) with the most energy
pub fn dominant_frequency(samples: &[i16], sample_rate: u32, lo: f64, hi: f64, step: f64) -> f64 {
    let mut best = (lo, f64::MIN);
    let mut freq = lo;

    while freq <= hi {
        let w = 2.0 * std::f64::consts::PI * freq / sample_rate as f64;
        let (mut re, mut im) = (0.0, 0.0);
        for (n, &s) in samples.iter().enumerate() {
            let x = s as f64;
            re += x * (w * n as f64).cos();
            im -= x * (w * n as f64).sin();
        }
        let power = re * re + im * im;
        if power > best.1 {
            best = (freq, power);
        }
        freq += step;
    }

    best.0
}
