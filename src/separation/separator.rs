//! Stem separation driver
//!
//! `StemSeparator` owns a `StemModel` and turns an audio file into one WAV
//! per stem. The model only ever sees fixed-length segments at its own
//! sample rate; decoding, resampling, segmenting, shift averaging and
//! writing happen here.

use super::chunking::{self, ChunkConfig, OverlapAdd};
use super::models::ModelSpec;
use crate::audio::{self, resample::resample_stereo, StereoBuffer};
use crate::error::StemError;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Largest time shift used when averaging shifted passes, in seconds
const MAX_SHIFT_SECONDS: f32 = 0.5;

/// A source separation model
///
/// `infer` receives one stereo segment of exactly the model's segment
/// length at the model's sample rate and returns one buffer per stem, in
/// `spec().stems` order.
pub trait StemModel {
    fn spec(&self) -> &ModelSpec;

    fn infer(&mut self, segment: &StereoBuffer) -> Result<Vec<StereoBuffer>, StemError>;
}

/// Files written for one separated track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StemSeparationResult {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    /// Stem name -> written WAV file
    pub stems: BTreeMap<String, PathBuf>,
}

pub struct StemSeparator<M: StemModel> {
    model: M,
    output_dir: PathBuf,
    shifts: u32,
    sample_rate: Option<u32>,
    bit_depth: u16,
}

impl<M: StemModel> StemSeparator<M> {
    /// Create a separator writing into `output_dir`, creating it if needed
    pub fn new(model: M, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create stem output directory: {:?}", output_dir))?;

        Ok(Self {
            model,
            output_dir,
            shifts: 1,
            sample_rate: None,
            bit_depth: 16,
        })
    }

    /// Average `shifts` time-shifted passes (1 disables shifting)
    pub fn with_shifts(mut self, shifts: u32) -> Self {
        self.shifts = shifts.max(1);
        self
    }

    /// Sample rate and bit depth of the written stems
    ///
    /// By default stems are written at the model's own rate.
    pub fn with_output_format(mut self, sample_rate: u32, bit_depth: u16) -> Self {
        self.sample_rate = Some(sample_rate);
        self.bit_depth = bit_depth;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn model_spec(&self) -> &ModelSpec {
        self.model.spec()
    }

    /// Separate `input` into `{stem}.wav` files in the output directory
    pub fn separate(&mut self, input: &Path) -> Result<StemSeparationResult> {
        self.separate_with_prefix(input, None)
    }

    /// Separate `input` into `{prefix}_{stem}.wav` files
    pub fn separate_with_prefix(
        &mut self,
        input: &Path,
        prefix: Option<&str>,
    ) -> Result<StemSeparationResult> {
        let spec = *self.model.spec();
        log::info!("Separating {:?} with model '{}'", input, spec.name);

        let decoded = audio::decode(input, None).map_err(|e| {
            log::error!("Failed to decode {:?}: {:#}", input, e);
            e
        })?;
        if decoded.frames() == 0 {
            anyhow::bail!("No audio frames in {:?}", input);
        }

        let stereo = resample_stereo(&decoded.to_stereo(), spec.sample_rate);
        let stems = self.separate_buffer(&stereo)?;

        let out_rate = self.sample_rate.unwrap_or(spec.sample_rate);
        for (name, stem) in spec.stems.iter().zip(stems) {
            let path = self.output_dir.join(stem_file(prefix, name));
            let stem = resample_stereo(&stem, out_rate);
            audio::write_stereo(&path, &stem, self.bit_depth).map_err(|e| StemError::Write {
                stem: name.to_string(),
                path: path.clone(),
                reason: format!("{:#}", e),
            })?;
            log::debug!("Wrote stem '{}' to {:?}", name, path);
        }

        Ok(StemSeparationResult {
            input_file: input.to_path_buf(),
            output_dir: self.output_dir.clone(),
            stems: collect_stems(&self.output_dir, prefix, spec.stems),
        })
    }

    /// Separate audio already at the model's sample rate
    ///
    /// Returns one full-length buffer per stem.
    pub fn separate_buffer(&mut self, audio: &StereoBuffer) -> Result<Vec<StereoBuffer>, StemError> {
        let spec = *self.model.spec();
        let offsets = shift_offsets(self.shifts, spec.sample_rate);

        let mut averaged: Option<Vec<StereoBuffer>> = None;
        for offset in &offsets {
            log::debug!("Separation pass with {} frame shift", offset);
            let stems = if *offset == 0 {
                self.run_segments(audio)?
            } else {
                let shifted = audio.delayed(*offset);
                self.run_segments(&shifted)?
                    .into_iter()
                    .map(|s| s.slice_padded(*offset, offset + audio.len()))
                    .collect()
            };

            averaged = Some(match averaged {
                None => stems,
                Some(mut acc) => {
                    for (a, s) in acc.iter_mut().zip(&stems) {
                        a.mix_in(s);
                    }
                    acc
                }
            });
        }

        let mut stems = averaged.unwrap_or_default();
        if offsets.len() > 1 {
            let scale = 1.0 / offsets.len() as f32;
            stems.iter_mut().for_each(|s| s.scale(scale));
        }
        Ok(stems)
    }

    fn run_segments(&mut self, audio: &StereoBuffer) -> Result<Vec<StereoBuffer>, StemError> {
        let spec = *self.model.spec();
        let config = ChunkConfig::for_model(&spec);
        let chunks = chunking::split(audio, &config);
        let mut ola = OverlapAdd::new(spec.stem_count(), audio.len(), &config, spec.sample_rate);

        for (i, chunk) in chunks.iter().enumerate() {
            log::trace!("Segment {}/{} at frame {}", i + 1, chunks.len(), chunk.start);
            let stems = self.model.infer(&chunk.audio)?;
            if stems.len() != spec.stem_count() {
                return Err(StemError::ShapeMismatch {
                    shape: vec![stems.len() as i64],
                    reason: format!(
                        "model '{}' should produce {} stems",
                        spec.name,
                        spec.stem_count()
                    ),
                });
            }
            ola.add(chunk.start, &stems);
        }

        Ok(ola.finish())
    }
}

/// `{stem}.wav` or `{prefix}_{stem}.wav`
fn stem_file(prefix: Option<&str>, stem: &str) -> String {
    match prefix {
        Some(p) => crate::metadata::stem_file_name(p, stem),
        None => format!("{}.wav", stem),
    }
}

/// Map each of `stems` to its file in `dir`, skipping missing ones
pub fn collect_stems(
    dir: &Path,
    prefix: Option<&str>,
    stems: &[&str],
) -> BTreeMap<String, PathBuf> {
    stems
        .iter()
        .filter_map(|name| {
            let path = dir.join(stem_file(prefix, name));
            if path.is_file() {
                Some((name.to_string(), path))
            } else {
                log::warn!("Expected stem '{}' not found at {:?}", name, path);
                None
            }
        })
        .collect()
}

/// Evenly spaced shifts in `[0, MAX_SHIFT_SECONDS)`, starting at zero
fn shift_offsets(shifts: u32, sample_rate: u32) -> Vec<usize> {
    let max = (MAX_SHIFT_SECONDS * sample_rate as f32) as usize;
    let n = shifts.max(1) as usize;
    (0..n).map(|i| i * max / n).collect()
}
