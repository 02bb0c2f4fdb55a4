//! Analysis trait definitions and data structures

use super::qualitative::QualitativeFeatures;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Audio analyzer trait - allows swapping the analysis backend
pub trait AudioAnalyzer {
    /// Analyze an audio file and return its features
    fn analyze_file(&self, path: &Path) -> Result<AudioFeatures>;

    /// Short backend name for logs and sidecar files
    fn name(&self) -> &'static str;
}

/// Which analyses to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub bpm: bool,
    pub key: bool,
    pub qualitative: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            bpm: true,
            key: true,
            qualitative: true,
        }
    }
}

impl AnalysisOptions {
    /// Build from the command-line skip flags
    pub fn from_skips(skip_bpm: bool, skip_key: bool, skip_qualitative: bool) -> Self {
        Self {
            bpm: !skip_bpm,
            key: !skip_key,
            qualitative: !skip_qualitative,
        }
    }

    /// Whether the tempo/key backend needs to run at all
    pub fn needs_tonal_analysis(&self) -> bool {
        self.bpm || self.key
    }
}

/// Features extracted from one audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// The analyzed file
    pub path: PathBuf,

    /// Tempo estimate; 0.0 when BPM analysis was skipped
    pub bpm: f64,

    /// Key label such as "Am"; empty when key analysis was skipped
    pub key: String,

    /// Mean of the confidences that were computed, in [0, 1]
    pub confidence: f64,

    pub bpm_confidence: Option<f64>,
    pub key_confidence: Option<f64>,

    /// Camelot wheel code for the key
    pub camelot: Option<String>,

    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,

    pub qualitative: Option<QualitativeFeatures>,
}

impl AudioFeatures {
    /// Record with no analysis results, for a decoded file
    pub fn empty(path: PathBuf, duration_seconds: f64, sample_rate: u32, channels: u16) -> Self {
        Self {
            path,
            bpm: 0.0,
            key: String::new(),
            confidence: 0.0,
            bpm_confidence: None,
            key_confidence: None,
            camelot: None,
            duration_seconds,
            sample_rate,
            channels,
            qualitative: None,
        }
    }

    /// Tempo if it was detected
    pub fn bpm(&self) -> Option<f64> {
        (self.bpm > 0.0).then_some(self.bpm)
    }

    /// Key label if it was detected
    pub fn key(&self) -> Option<&str> {
        (!self.key.is_empty()).then_some(self.key.as_str())
    }

    /// Recompute `confidence` from the individual confidences
    pub(crate) fn combine_confidence(&mut self) {
        let parts: Vec<f64> = [self.bpm_confidence, self.key_confidence]
            .into_iter()
            .flatten()
            .map(|c| c.clamp(0.0, 1.0))
            .collect();

        self.confidence = if parts.is_empty() {
            0.0
        } else {
            parts.iter().sum::<f64>() / parts.len() as f64
        };
    }
}
