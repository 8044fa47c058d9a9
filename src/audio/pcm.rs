// 16-bit PCM quantization
//
// Float samples are saturated into the i16 range, never wrapped. Negative
// values scale by 32768 and non-negative values by 32767, so full scale maps
// to i16::MIN and i16::MAX exactly: quantize(-1.0) == -32768 and
// quantize(1.0) == 32767. A single 32767 scale would stop at -32767 and
// never produce i16::MIN. Negative results may therefore be one step lower
// than round(s * 32767).

/// Mono 16-bit PCM samples at a fixed sample rate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcm16Buffer {
    sample_rate: u32,
    samples: Vec<i16>,
}

impl Pcm16Buffer {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

/// Quantize a single float sample to i16 with saturation.
///
/// NaN maps to 0.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }

    let scaled = if sample < 0.0 {
        sample * 32768.0
    } else {
        sample * 32767.0
    };

    scaled
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Quantize a mono float sequence into a [`Pcm16Buffer`]
pub fn quantize_buffer(samples: &[f32], sample_rate: u32) -> Pcm16Buffer {
    Pcm16Buffer::new(sample_rate, samples.iter().map(|&s| quantize(s)).collect())
}
