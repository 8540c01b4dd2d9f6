//! Finalized recording payload handed to the submission pipeline.

use crate::error::{Result, RoundupError};

/// Container MIME type every clip is tagged with. The remote summarizer
/// receives exactly this string alongside the base64 payload.
pub const WAV_MIME: &str = "audio/wav";

/// A complete, encoded recording produced when a capture session ends.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Container MIME type (always [`WAV_MIME`] for the cpal backend).
    pub mime_type: &'static str,
    /// Encoded audio bytes (16-bit PCM WAV).
    pub bytes: Vec<u8>,
    /// Recorded duration, rounded to whole seconds.
    pub duration_seconds: u64,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioClip {
    /// Encode mono f32 samples into a WAV clip.
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Result<Self> {
        let bytes = encode_wav(samples, sample_rate)?;
        let duration_seconds = (samples.len() as f64 / sample_rate as f64).round() as u64;
        Ok(Self {
            mime_type: WAV_MIME,
            bytes,
            duration_seconds,
            sample_rate,
        })
    }
}

/// Encode mono f32 samples in [-1.0, 1.0] as 16-bit PCM WAV.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| RoundupError::CaptureStream(e.to_string()))?;
    for &sample in samples {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(quantized)
            .map_err(|e| RoundupError::CaptureStream(e.to_string()))?;
    }
    writer
        .finalize()
        .map_err(|e| RoundupError::CaptureStream(e.to_string()))?;

    Ok(cursor.into_inner())
}
