use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use super::pcm::Pcm16Buffer;
use crate::error::{Error, Result};

/// Size of the canonical RIFF/WAVE header for 16-bit mono PCM
pub const WAV_HEADER_LEN: usize = 44;

/// Mime type of every [`WavBlob`]
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Encoded WAV file, owned by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavBlob {
    bytes: Vec<u8>,
}

impl WavBlob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &'static str {
        WAV_MIME_TYPE
    }

    /// Write the blob to disk unchanged
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::write(path, &self.bytes).await?;
        info!("Saved WAV ({} bytes) to {}", self.bytes.len(), path.display());
        Ok(())
    }
}

impl AsRef<[u8]> for WavBlob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Serialize mono 16-bit PCM into a canonical 44-byte-header WAV file.
pub fn write_wav(pcm: &Pcm16Buffer) -> Result<WavBlob> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: pcm.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    // RIFF sizes are u32 and include the 36 header bytes after the size field
    let data_size = pcm.len() as u64 * 2;
    if data_size > (u32::MAX - 36) as u64 {
        return Err(Error::Wav(format!(
            "{} samples do not fit in a WAV file",
            pcm.len()
        )));
    }

    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + data_size as usize));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| Error::Wav(format!("Failed to start WAV: {}", e)))?;

        for &sample in pcm.samples() {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Wav(format!("Failed to write sample: {}", e)))?;
        }

        writer
            .finalize()
            .map_err(|e| Error::Wav(format!("Failed to finalize WAV: {}", e)))?;
    }

    Ok(WavBlob {
        bytes: cursor.into_inner(),
    })
}

/// Read a mono 16-bit PCM WAV file back into a [`Pcm16Buffer`]
pub fn parse_wav(bytes: &[u8]) -> Result<Pcm16Buffer> {
    let reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| Error::Wav(format!("Invalid WAV: {}", e)))?;

    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(Error::Wav(format!("Expected mono, got {} channels", spec.channels)));
    }
    if spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
        return Err(Error::Wav(format!(
            "Expected 16-bit integer PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Wav(format!("Failed to read samples: {}", e)))?;

    Ok(Pcm16Buffer::new(spec.sample_rate, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn test_header_layout() {
        let pcm = Pcm16Buffer::new(22050, vec![0, 1, -1, i16::MAX, i16::MIN]);
        let wav = write_wav(&pcm).unwrap();
        let b = wav.as_bytes();

        assert_eq!(&b[0..4], b"RIFF");
        assert_eq!(u32_at(b, 4), 36 + 10);
        assert_eq!(&b[8..12], b"WAVE");
        assert_eq!(&b[12..16], b"fmt ");
        assert_eq!(u32_at(b, 16), 16);
        assert_eq!(u16_at(b, 20), 1);
        assert_eq!(u16_at(b, 22), 1);
        assert_eq!(u32_at(b, 24), 22050);
        assert_eq!(u32_at(b, 28), 44100);
        assert_eq!(u16_at(b, 32), 2);
        assert_eq!(u16_at(b, 34), 16);
        assert_eq!(&b[36..40], b"data");
        assert_eq!(u32_at(b, 40), 10);
        assert_eq!(b.len(), 44 + 10);
    }

    #[test]
    fn test_samples_little_endian() {
        let pcm = Pcm16Buffer::new(22050, vec![0x0102, -2]);
        let wav = write_wav(&pcm).unwrap();

        assert_eq!(&wav.as_bytes()[44..], &[0x02, 0x01, 0xFE, 0xFF]);
    }

    #[test]
    fn test_sizes_track_sample_count() {
        for n in [0usize, 1, 7, 22050] {
            let wav = write_wav(&Pcm16Buffer::new(22050, vec![5; n])).unwrap();
            let b = wav.as_bytes();
            assert_eq!(u32_at(b, 4) as usize, 36 + 2 * n);
            assert_eq!(u32_at(b, 40) as usize, 2 * n);
            assert_eq!(b.len(), 44 + 2 * n);
        }
    }

    #[test]
    fn test_round_trip() {
        let samples: Vec<i16> = (0..1000).map(|i| ((i * 97) % 65536 - 32768) as i16).collect();
        for rate in [8000, 22050, 44100] {
            let pcm = Pcm16Buffer::new(rate, samples.clone());
            let parsed = parse_wav(write_wav(&pcm).unwrap().as_bytes()).unwrap();
            assert_eq!(parsed, pcm);
        }
    }

    #[test]
    fn test_round_trip_empty() {
        let pcm = Pcm16Buffer::new(22050, Vec::new());
        let wav = write_wav(&pcm).unwrap();
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(parse_wav(wav.as_bytes()).unwrap(), pcm);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_wav(b"not a wav"), Err(Error::Wav(_))));
        assert!(matches!(parse_wav(&[]), Err(Error::Wav(_))));
    }

    #[test]
    fn test_parse_rejects_stereo() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            writer.write_sample(1i16).unwrap();
            writer.write_sample(2i16).unwrap();
            writer.finalize().unwrap();
        }

        let err = parse_wav(cursor.get_ref()).unwrap_err();
        assert!(err.to_string().contains("mono"));
    }

    #[test]
    fn test_blob_mime_type() {
        let wav = write_wav(&Pcm16Buffer::new(22050, vec![])).unwrap();
        assert_eq!(wav.mime_type(), "audio/wav");
    }
}
