//! WAV writing via hound

use anyhow::{Context, Result};
use std::path::Path;

use super::StereoBuffer;

/// Write interleaved f32 samples as a WAV file
///
/// `bit_depth` selects 16/24-bit integer or 32-bit float output. Samples
/// outside [-1, 1] are clipped for integer formats.
pub fn write_interleaved(
    path: &Path,
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
    bit_depth: u16,
) -> Result<()> {
    let sample_format = match bit_depth {
        16 | 24 => hound::SampleFormat::Int,
        32 => hound::SampleFormat::Float,
        other => anyhow::bail!("Unsupported WAV bit depth: {}", other),
    };

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bit_depth,
        sample_format,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    match bit_depth {
        16 => {
            for s in samples {
                let v = (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                writer.write_sample(v)?;
            }
        }
        24 => {
            const MAX_24: f32 = 8_388_607.0;
            for s in samples {
                let v = (s * MAX_24).clamp(-MAX_24 - 1.0, MAX_24) as i32;
                writer.write_sample(v)?;
            }
        }
        _ => {
            for s in samples {
                writer.write_sample(*s)?;
            }
        }
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {:?}", path))?;

    log::debug!("Wrote {} samples to {:?}", samples.len(), path);
    Ok(())
}

/// Write a stereo buffer as a WAV file at its own sample rate
pub fn write_stereo(path: &Path, audio: &StereoBuffer, bit_depth: u16) -> Result<()> {
    write_interleaved(path, &audio.interleaved(), audio.sample_rate, 2, bit_depth)
}
