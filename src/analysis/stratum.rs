//! Unified audio analysis using stratum-dsp
//!
//! Audio is decoded once; BPM and key come from a single stratum-dsp pass,
//! qualitative features are computed from the same mono buffer.

use super::key::MusicalKey;
use super::qualitative;
use super::traits::{AnalysisOptions, AudioAnalyzer, AudioFeatures};
use crate::audio;
use crate::config::AudioAnalysisConfig;
use anyhow::Result;
use std::path::Path;
use stratum_dsp::{analyze_audio, AnalysisConfig};

/// Default analyzer backed by stratum-dsp
pub struct StratumAnalyzer {
    options: AnalysisOptions,
    /// Minimum BPM for the folding range
    min_bpm: f32,
    /// Maximum BPM for the folding range
    max_bpm: f32,
    /// Seconds of audio decoded for analysis
    max_seconds: u32,
}

impl StratumAnalyzer {
    pub fn new() -> Self {
        Self::from_config(&AudioAnalysisConfig::default())
    }

    pub fn from_config(config: &AudioAnalysisConfig) -> Self {
        Self {
            options: AnalysisOptions::default(),
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            max_seconds: config.max_analysis_seconds,
        }
    }

    /// Select which analyses run
    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    /// Create analyzer with custom BPM range
    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }

    pub fn options(&self) -> AnalysisOptions {
        self.options
    }
}

impl Default for StratumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioAnalyzer for StratumAnalyzer {
    fn analyze_file(&self, path: &Path) -> Result<AudioFeatures> {
        log::info!("Analyzing audio file: {:?}", path);

        let decoded = match audio::decode(path, Some(self.max_seconds)) {
            Ok(d) => d,
            Err(e) => {
                log::error!("Error loading audio file {:?}: {:#}", path, e);
                return Err(e);
            }
        };

        let mut features = AudioFeatures::empty(
            path.to_path_buf(),
            decoded.duration_seconds(),
            decoded.sample_rate,
            decoded.channels,
        );

        let samples = decoded.to_mono();
        let sample_rate = decoded.sample_rate;
        drop(decoded);

        if self.options.needs_tonal_analysis() {
            if samples.len() < sample_rate as usize {
                anyhow::bail!("Audio too short for analysis: {:?}", path);
            }

            let result = analyze_audio(&samples, sample_rate, AnalysisConfig::default())
                .map_err(|e| anyhow::anyhow!("Audio analysis failed for {:?}: {:?}", path, e))?;

            if self.options.bpm {
                let bpm = fold_bpm(result.bpm, self.min_bpm, self.max_bpm);
                features.bpm = bpm as f64;
                features.bpm_confidence = Some(result.bpm_confidence as f64);
            }

            if self.options.key {
                match MusicalKey::from_stratum(&result.key) {
                    Some(key) => {
                        features.key = key.label().to_string();
                        features.camelot = Some(key.camelot());
                        features.key_confidence = Some(result.key_confidence as f64);
                    }
                    None => log::warn!("Could not map key {} for {:?}", result.key.name(), path),
                }
            }
        }

        if self.options.qualitative {
            features.qualitative = Some(qualitative::extract(&samples, sample_rate));
        }

        features.combine_confidence();

        log::info!(
            "Analysis complete: BPM={}, Key={} (confidence {:.2})",
            features
                .bpm()
                .map(|b| format!("{:.1}", b))
                .unwrap_or_else(|| "-".to_string()),
            features.key().unwrap_or("-"),
            features.confidence
        );

        Ok(features)
    }

    fn name(&self) -> &'static str {
        "stratum-dsp"
    }
}

/// Fold a tempo into `[min_bpm, max_bpm]` by doubling or halving
pub fn fold_bpm(bpm: f32, min_bpm: f32, max_bpm: f32) -> f32 {
    let mut bpm = bpm;
    if min_bpm > 0.0 && max_bpm > 0.0 && bpm > 0.0 {
        // Double BPM if below minimum
        while bpm < min_bpm && bpm * 2.0 <= max_bpm {
            bpm *= 2.0;
            log::debug!("BPM doubled to {:.1} (was below minimum {})", bpm, min_bpm);
        }
        // Halve BPM if above maximum
        while bpm > max_bpm && bpm / 2.0 >= min_bpm {
            bpm /= 2.0;
            log::debug!("BPM halved to {:.1} (was above maximum {})", bpm, max_bpm);
        }
    }
    bpm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_requires_file() {
        let analyzer = StratumAnalyzer::new();
        let result = analyzer.analyze_file(Path::new("/nonexistent/file.wav"));
        assert!(result.is_err());
    }

    #[test]
    fn test_fold_bpm() {
        assert_eq!(fold_bpm(64.0, 70.0, 180.0), 128.0);
        assert_eq!(fold_bpm(256.0, 70.0, 180.0), 128.0);
        assert_eq!(fold_bpm(174.0, 70.0, 180.0), 174.0);
        assert_eq!(fold_bpm(30.0, 70.0, 180.0), 120.0);
        assert_eq!(fold_bpm(0.0, 70.0, 180.0), 0.0);
    }

    #[test]
    fn test_builder() {
        let analyzer = StratumAnalyzer::new()
            .with_options(AnalysisOptions::from_skips(true, false, false))
            .with_bpm_range(60.0, 140.0);
        assert!(!analyzer.options().bpm);
        assert_eq!(analyzer.min_bpm, 60.0);
        assert_eq!(analyzer.name(), "stratum-dsp");
    }
}
