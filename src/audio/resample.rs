//! Sample rate conversion using rubato
//!
//! Channels are resampled together so they stay aligned. A linear
//! interpolator takes over if rubato rejects the rate pair.

use rubato::{FftFixedInOut, Resampler};

use super::StereoBuffer;

const CHUNK_SIZE: usize = 1024;

/// Resample planar channels from `from_rate` to `to_rate`
pub fn resample_channels(channels: &[Vec<f32>], from_rate: u32, to_rate: u32) -> Vec<Vec<f32>> {
    if from_rate == to_rate || channels.is_empty() {
        return channels.to_vec();
    }

    let frames = channels[0].len();
    let ratio = to_rate as f64 / from_rate as f64;
    let expected_len = (frames as f64 * ratio).round() as usize;

    let mut resampler = match FftFixedInOut::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        channels.len(),
    ) {
        Ok(r) => r,
        Err(e) => {
            log::debug!("rubato init failed ({}), using linear resampling", e);
            return channels
                .iter()
                .map(|c| resample_linear(c, from_rate, to_rate))
                .collect();
        }
    };

    let chunk_in = resampler.input_frames_next();
    let delay = resampler.output_delay();
    let mut output: Vec<Vec<f32>> =
        vec![Vec::with_capacity(delay + expected_len + chunk_in); channels.len()];

    // Zero blocks past the end flush the filter delay so the tail survives
    let mut pos = 0;
    while pos < frames || output[0].len() < delay + expected_len {
        let block: Vec<Vec<f32>> = channels
            .iter()
            .map(|c| {
                let mut chunk = c[pos.min(frames)..(pos + chunk_in).min(frames)].to_vec();
                chunk.resize(chunk_in, 0.0);
                chunk
            })
            .collect();

        match resampler.process(&block, None) {
            Ok(resampled) => {
                for (out, chunk) in output.iter_mut().zip(resampled) {
                    out.extend_from_slice(&chunk);
                }
            }
            Err(e) => {
                log::debug!("rubato processing failed ({}), using linear resampling", e);
                return channels
                    .iter()
                    .map(|c| resample_linear(c, from_rate, to_rate))
                    .collect();
            }
        }

        pos += chunk_in;
    }

    for out in output.iter_mut() {
        out.drain(..delay.min(out.len()));
        out.resize(expected_len, 0.0);
    }

    output
}

/// Resample a stereo buffer
pub fn resample_stereo(audio: &StereoBuffer, to_rate: u32) -> StereoBuffer {
    if audio.sample_rate == to_rate {
        return audio.clone();
    }

    let mut channels = resample_channels(
        &[audio.left.clone(), audio.right.clone()],
        audio.sample_rate,
        to_rate,
    );
    let right = channels.pop().unwrap_or_default();
    let left = channels.pop().unwrap_or_default();

    StereoBuffer::new(left, right, to_rate)
}

/// Resample interleaved samples with `channel_count` channels
pub fn resample_interleaved(
    samples: &[f32],
    channel_count: usize,
    from_rate: u32,
    to_rate: u32,
) -> Vec<f32> {
    if from_rate == to_rate || channel_count == 0 {
        return samples.to_vec();
    }

    let planar: Vec<Vec<f32>> = (0..channel_count)
        .map(|ch| {
            samples
                .iter()
                .skip(ch)
                .step_by(channel_count)
                .copied()
                .collect()
        })
        .collect();

    let resampled = resample_channels(&planar, from_rate, to_rate);
    let frames = resampled.first().map(|c| c.len()).unwrap_or(0);

    let mut out = Vec::with_capacity(frames * channel_count);
    for i in 0..frames {
        for channel in &resampled {
            out.push(channel[i]);
        }
    }
    out
}

/// Linear interpolation resampler
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / step).round() as usize;

    (0..output_len)
        .map(|i| {
            let src_pos = i as f64 * step;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(a), Some(b)) => a * (1.0 - frac) + b * frac,
                (Some(a), None) => *a,
                _ => samples[samples.len() - 1],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 44100, 44100), samples);
        let channels = vec![samples.clone()];
        assert_eq!(resample_channels(&channels, 48000, 48000), channels);
    }

    #[test]
    fn test_linear_halves_length() {
        let samples: Vec<f32> = (0..1000).map(|i| i as f32).collect();
        let out = resample_linear(&samples, 44100, 22050);
        assert_eq!(out.len(), 500);
        assert!((out[10] - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_channels_length_follows_ratio() {
        let frames = 48000;
        let sine: Vec<f32> = (0..frames)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        let out = resample_channels(&[sine.clone(), sine], 48000, 44100);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 44100);
        assert_eq!(out[0].len(), out[1].len());
        assert!(out[0].iter().all(|s| s.is_finite() && s.abs() <= 1.5));
    }

    #[test]
    fn test_tail_is_not_truncated() {
        let dc = vec![0.5f32; 96000];
        let out = resample_channels(&[dc], 48000, 44100);
        let out = &out[0];
        assert_eq!(out.len(), 88200);

        // Steady DC up to the filter's edge response at the very end
        for s in &out[88200 - 400..88200 - 200] {
            assert!((s - 0.5).abs() < 0.05, "tail sample {}", s);
        }
        let last: f32 = out[88200 - 100..].iter().sum::<f32>() / 100.0;
        assert!(last > 0.3, "tail mean {}", last);
    }

    #[test]
    fn test_interleaved_keeps_channel_count() {
        let samples: Vec<f32> = (0..2000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let out = resample_interleaved(&samples, 2, 44100, 48000);
        assert_eq!(out.len() % 2, 0);
        assert_eq!(out.len() / 2, (1000.0f64 * 48000.0 / 44100.0).round() as usize);
    }

    #[test]
    fn test_stereo_rate_is_updated() {
        let audio = StereoBuffer::new(vec![0.0; 4410], vec![0.0; 4410], 44100);
        let out = resample_stereo(&audio, 22050);
        assert_eq!(out.sample_rate, 22050);
        assert_eq!(out.len(), 2205);
    }
}
