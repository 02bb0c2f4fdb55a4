//! Output directory management for analyzed tracks

use crate::audio::{self, resample::resample_interleaved};
use crate::config::AudioAnalysisConfig;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// How a track ends up in the output directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// WAV renamed within the input directory
    Renamed,
    /// WAV copied byte for byte
    Copied,
    /// Decoded and written as WAV
    Transcoded,
}

/// Hands out collision-free output names and places files
///
/// Names are reserved under a lock so parallel workers never pick the
/// same path.
pub struct OutputOrganizer {
    output_dir: PathBuf,
    in_place: bool,
    reserved: Mutex<HashSet<PathBuf>>,
}

impl OutputOrganizer {
    /// Create the output directory (with parents) if needed
    pub fn new(input_dir: &Path, output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
        Ok(Self::plan(input_dir, output_dir))
    }

    /// Organizer that only hands out names; nothing is created on disk
    pub fn plan(input_dir: &Path, output_dir: &Path) -> Self {
        let in_place = same_dir(input_dir, output_dir);
        log::debug!("Output directory {:?} (in place: {})", output_dir, in_place);

        Self {
            output_dir: output_dir.to_path_buf(),
            in_place,
            reserved: Mutex::new(HashSet::new()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Reserve `<base>.wav` (or `<base>-N.wav`) in the output directory
    ///
    /// `source` is allowed to be the reserved path itself, so a file that
    /// already carries its final name keeps it.
    pub fn reserve(&self, base: &str, source: &Path) -> PathBuf {
        let mut reserved = match self.reserved.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut n = 1;
        loop {
            let name = if n == 1 {
                format!("{}.wav", base)
            } else {
                format!("{}-{}.wav", base, n)
            };
            let candidate = self.output_dir.join(name);
            let taken = reserved.contains(&candidate)
                || (candidate.exists() && !same_file(&candidate, source));
            if !taken {
                reserved.insert(candidate.clone());
                return candidate;
            }
            n += 1;
        }
    }

    /// Put `source` at `dest` as a WAV file
    pub fn place(
        &self,
        source: &Path,
        dest: &Path,
        config: &AudioAnalysisConfig,
    ) -> Result<Placement> {
        if audio::is_wav(source) {
            if same_file(source, dest) {
                return Ok(Placement::Renamed);
            }
            if self.in_place {
                fs::rename(source, dest)
                    .with_context(|| format!("Failed to rename {:?} to {:?}", source, dest))?;
                return Ok(Placement::Renamed);
            }
            fs::copy(source, dest)
                .with_context(|| format!("Failed to copy {:?} to {:?}", source, dest))?;
            return Ok(Placement::Copied);
        }

        transcode(source, dest, config)?;
        Ok(Placement::Transcoded)
    }
}

/// Decode any supported file and write it as WAV at the configured format
pub fn transcode(source: &Path, dest: &Path, config: &AudioAnalysisConfig) -> Result<()> {
    let decoded = audio::decode(source, None)?;
    let samples = resample_interleaved(
        &decoded.samples,
        decoded.channels as usize,
        decoded.sample_rate,
        config.sample_rate,
    );
    audio::write_interleaved(
        dest,
        &samples,
        config.sample_rate,
        decoded.channels,
        config.bit_depth,
    )
    .with_context(|| format!("Failed to transcode {:?}", source))?;

    log::debug!(
        "Transcoded {:?} ({} Hz) to {:?} ({} Hz, {}-bit)",
        source,
        decoded.sample_rate,
        dest,
        config.sample_rate,
        config.bit_depth
    );
    Ok(())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
