//! Fixed-length segmenting with overlap-add reassembly
//!
//! Separation models take segments of a fixed length. Audio is cut into
//! overlapping segments (the last one zero-padded), each segment is
//! separated, and the per-stem outputs are cross-faded back together.

use super::models::ModelSpec;
use crate::audio::StereoBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Frames per segment
    pub chunk_samples: usize,
    /// Frames shared by consecutive segments
    pub overlap_samples: usize,
}

impl ChunkConfig {
    pub fn new(chunk_samples: usize, overlap_samples: usize) -> Self {
        let chunk_samples = chunk_samples.max(1);
        // stride must stay positive
        let overlap_samples = overlap_samples.min(chunk_samples / 2);
        Self {
            chunk_samples,
            overlap_samples,
        }
    }

    pub fn for_model(spec: &ModelSpec) -> Self {
        let rate = spec.sample_rate as f32;
        Self::new(
            (spec.segment_seconds * rate) as usize,
            (spec.overlap_seconds * rate) as usize,
        )
    }

    /// Distance between segment starts
    pub fn stride(&self) -> usize {
        self.chunk_samples - self.overlap_samples
    }
}

/// One input segment
#[derive(Debug, Clone)]
pub struct Chunk {
    /// First frame of the segment in the source audio
    pub start: usize,
    /// Source frames in this segment; the rest is padding
    pub valid: usize,
    /// Exactly `chunk_samples` frames
    pub audio: StereoBuffer,
}

/// Cut audio into overlapping fixed-length segments
pub fn split(audio: &StereoBuffer, config: &ChunkConfig) -> Vec<Chunk> {
    let total = audio.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = start + config.chunk_samples;
        chunks.push(Chunk {
            start,
            valid: end.min(total).saturating_sub(start),
            audio: audio.slice_padded(start, end),
        });

        if end >= total {
            break;
        }
        start += config.stride();
    }

    chunks
}

/// Accumulates separated segments into full-length stems
pub struct OverlapAdd {
    stems: Vec<StereoBuffer>,
    weight_sum: Vec<f32>,
    fade: Vec<f32>,
}

impl OverlapAdd {
    pub fn new(stem_count: usize, total: usize, config: &ChunkConfig, sample_rate: u32) -> Self {
        Self {
            stems: (0..stem_count)
                .map(|_| StereoBuffer::silent(total, sample_rate))
                .collect(),
            weight_sum: vec![0.0; total],
            fade: fade_weights(config.chunk_samples, config.overlap_samples),
        }
    }

    /// Add the separated stems of the segment starting at `start`
    pub fn add(&mut self, start: usize, stems: &[StereoBuffer]) {
        let total = self.weight_sum.len();
        let seg_len = stems.iter().map(|s| s.len()).min().unwrap_or(0);
        let len = seg_len.min(self.fade.len()).min(total.saturating_sub(start));

        for i in 0..len {
            let out = start + i;
            let w = self.fade[i];
            for (acc, stem) in self.stems.iter_mut().zip(stems) {
                acc.left[out] += stem.left[i] * w;
                acc.right[out] += stem.right[i] * w;
            }
            self.weight_sum[out] += w;
        }
    }

    /// Normalize by accumulated weights and return the stems
    pub fn finish(mut self) -> Vec<StereoBuffer> {
        for (i, w) in self.weight_sum.iter().enumerate() {
            if *w > 1e-8 {
                let inv = 1.0 / w;
                for stem in self.stems.iter_mut() {
                    stem.left[i] *= inv;
                    stem.right[i] *= inv;
                }
            }
        }
        self.stems
    }
}

/// Linear fade-in and fade-out over `overlap` frames, never reaching zero
fn fade_weights(len: usize, overlap: usize) -> Vec<f32> {
    let mut weights = vec![1.0f32; len];
    if overlap == 0 {
        return weights;
    }
    for i in 0..overlap.min(len) {
        let w = (i + 1) as f32 / (overlap + 1) as f32;
        weights[i] = weights[i].min(w);
        weights[len - 1 - i] = weights[len - 1 - i].min(w);
    }
    weights
}
