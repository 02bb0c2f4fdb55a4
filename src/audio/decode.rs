//! Audio decoding using symphonia
//!
//! Decodes any supported container to interleaved f32 samples. Analysis
//! downmixes to mono, separation works on a stereo view.

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded PCM audio, interleaved
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Planar stereo audio
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Average all channels into one
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Stereo view: mono is duplicated, extra channels are dropped
    pub fn to_stereo(&self) -> StereoBuffer {
        let channels = self.channels.max(1) as usize;
        let frames = self.frames();
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);

        for frame in self.samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }

        StereoBuffer {
            left,
            right,
            sample_rate: self.sample_rate,
        }
    }
}

impl StereoBuffer {
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self {
            left,
            right,
            sample_rate,
        }
    }

    pub fn silent(frames: usize, sample_rate: u32) -> Self {
        Self::new(vec![0.0; frames], vec![0.0; frames], sample_rate)
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Copy of frames `start..end`, zero-padded past the end of the buffer
    pub fn slice_padded(&self, start: usize, end: usize) -> StereoBuffer {
        let len = end.saturating_sub(start);
        let mut out = StereoBuffer::silent(len, self.sample_rate);
        if start < self.len() {
            let available = (self.len() - start).min(len);
            out.left[..available].copy_from_slice(&self.left[start..start + available]);
            out.right[..available].copy_from_slice(&self.right[start..start + available]);
        }
        out
    }

    /// Copy with `frames` of silence in front
    pub fn delayed(&self, frames: usize) -> StereoBuffer {
        let mut out = StereoBuffer::silent(frames + self.len(), self.sample_rate);
        out.left[frames..].copy_from_slice(&self.left);
        out.right[frames..].copy_from_slice(&self.right);
        out
    }

    /// Sample-wise sum; extra frames in `other` are ignored
    pub fn mix_in(&mut self, other: &StereoBuffer) {
        for (a, b) in self.left.iter_mut().zip(&other.left) {
            *a += b;
        }
        for (a, b) in self.right.iter_mut().zip(&other.right) {
            *a += b;
        }
    }

    pub fn scale(&mut self, factor: f32) {
        self.left.iter_mut().for_each(|s| *s *= factor);
        self.right.iter_mut().for_each(|s| *s *= factor);
    }

    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * 2);
        for (l, r) in self.left.iter().zip(self.right.iter()) {
            out.push(*l);
            out.push(*r);
        }
        out
    }
}

/// Decode an audio file to interleaved f32 samples
///
/// When `max_seconds` is set, decoding stops once that much audio is
/// collected.
pub fn decode(path: &Path, max_seconds: Option<u32>) -> Result<DecodedAudio> {
    log::debug!("Decoding audio: {:?}", path);

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {:?}", path))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(ext.to_str().unwrap_or(""));
    }

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .with_context(|| format!("Failed to probe audio format: {:?}", path))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio track found")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("No sample rate in audio track")?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let dec_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .context("Failed to create audio decoder")?;

    let mut samples: Vec<f32> = Vec::new();
    let max_frames = max_seconds.map(|s| sample_rate as usize * s as usize);

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Error reading packet: {:?}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Error decoding packet: {:?}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let duration = decoded.capacity() as u64;
        channels = spec.channels.count() as u16;

        let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());

        if let Some(max) = max_frames {
            if channels > 0 && samples.len() / channels as usize >= max {
                samples.truncate(max * channels as usize);
                break;
            }
        }
    }

    if channels == 0 || samples.is_empty() {
        anyhow::bail!("No audio decoded from {:?}", path);
    }

    let audio = DecodedAudio {
        samples,
        sample_rate,
        channels,
    };

    log::debug!(
        "Decoded {} frames ({:.1}s) at {}Hz, {} channel(s)",
        audio.frames(),
        audio.duration_seconds(),
        sample_rate,
        channels
    );

    Ok(audio)
}
