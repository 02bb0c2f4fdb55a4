//! Application configuration
//!
//! Defaults are compiled in. A JSON file can override any subset of fields,
//! and command-line flags override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the AcoustID client key
pub const ACOUSTID_KEY_ENV: &str = "ACOUSTID_API_KEY";

/// Environment variable pointing at a separation model file
pub const MODEL_PATH_ENV: &str = "STEMPREP_MODEL_PATH";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio_analysis: AudioAnalysisConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub stem_separation: StemSeparationConfig,
}

/// Configuration for the analyze command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioAnalysisConfig {
    /// Sample rate for transcoded output files
    pub sample_rate: u32,

    /// Bit depth for transcoded output files (16, 24 or 32)
    pub bit_depth: u16,

    /// Output directory when none is given on the command line; the input
    /// directory is used when this is unset too
    pub output_dir: Option<PathBuf>,

    /// Lower bound of the BPM folding range
    pub min_bpm: f32,

    /// Upper bound of the BPM folding range
    pub max_bpm: f32,

    /// Only the first N seconds are decoded for analysis
    pub max_analysis_seconds: u32,
}

impl Default for AudioAnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            bit_depth: 16,
            output_dir: None,
            min_bpm: 70.0,
            max_bpm: 180.0,
            max_analysis_seconds: 240,
        }
    }
}

/// Configuration for fingerprinting and MusicBrainz metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicBrainzConfig {
    pub enabled: bool,

    /// User agent sent with AcoustID requests
    pub user_agent: String,

    /// Path to fpcalc; searched in PATH when unset
    pub fpcalc_path: Option<PathBuf>,

    /// AcoustID application key
    pub acoustid_api_key: Option<String>,

    /// Minimum AcoustID score for a match to be used
    pub min_score: f64,

    pub timeout_secs: u64,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            user_agent: format!(
                "{}/{} ( {} )",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                "https://github.com/benkant/music-stem-separator"
            ),
            fpcalc_path: None,
            acoustid_api_key: None,
            min_score: 0.5,
            timeout_secs: 15,
        }
    }
}

impl MusicBrainzConfig {
    /// API key from the config file, falling back to the environment
    pub fn api_key(&self) -> Option<String> {
        self.acoustid_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(ACOUSTID_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// fpcalc executable to invoke
    pub fn fpcalc(&self) -> PathBuf {
        self.fpcalc_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("fpcalc"))
    }
}

/// Inference device for the separation model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    Cuda,
}

/// Configuration for the split command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StemSeparationConfig {
    /// Separation model (e.g. htdemucs, htdemucs_ft, mdx_extra, 4stems)
    pub model_name: String,

    /// Explicit model file, bypassing the search locations
    pub model_path: Option<PathBuf>,

    /// Output directory when none is given on the command line; the input
    /// directory is used when this is unset too
    pub output_dir: Option<PathBuf>,

    /// Sample rate of written stems
    pub sample_rate: u32,

    /// Bit depth of written stems (16, 24 or 32)
    pub bit_depth: u16,

    pub device: Device,

    /// Number of time-shifted passes averaged together
    pub shifts: u32,
}

impl Default for StemSeparationConfig {
    fn default() -> Self {
        Self {
            model_name: "htdemucs".to_string(),
            model_path: None,
            output_dir: None,
            sample_rate: 44100,
            bit_depth: 16,
            device: Device::Cpu,
            shifts: 1,
        }
    }
}

impl StemSeparationConfig {
    /// Model path from the config file, falling back to the environment
    pub fn model_override(&self) -> Option<PathBuf> {
        self.model_path
            .clone()
            .or_else(|| std::env::var(MODEL_PATH_ENV).ok().map(PathBuf::from))
            .map(|p| expand_path(&p))
    }
}

impl AppConfig {
    /// Load configuration from a JSON file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let path = expand_path(path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.musicbrainz.fpcalc_path = config.musicbrainz.fpcalc_path.map(|p| expand_path(&p));
        config.audio_analysis.output_dir = config.audio_analysis.output_dir.map(|p| expand_path(&p));
        config.stem_separation.output_dir = config.stem_separation.output_dir.map(|p| expand_path(&p));
        config.validate()?;

        log::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Set the separation model
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.stem_separation.model_name = model_name.into();
        self
    }

    /// Set an explicit separation model file
    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.stem_separation.model_path = Some(expand_path(&path));
        self
    }

    /// Set the number of shifted separation passes
    pub fn with_shifts(mut self, shifts: u32) -> Self {
        self.stem_separation.shifts = shifts;
        self
    }

    /// Enable or disable fingerprinting
    pub fn with_fingerprinting(mut self, enabled: bool) -> Self {
        self.musicbrainz.enabled = enabled;
        self
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        check_bit_depth(self.audio_analysis.bit_depth)
            .context("Invalid audio_analysis.bit_depth")?;
        check_bit_depth(self.stem_separation.bit_depth)
            .context("Invalid stem_separation.bit_depth")?;

        let analysis = &self.audio_analysis;
        if analysis.min_bpm <= 0.0 || analysis.max_bpm < analysis.min_bpm * 2.0 {
            anyhow::bail!(
                "BPM range {}-{} must be positive and span at least one octave",
                analysis.min_bpm,
                analysis.max_bpm
            );
        }
        if analysis.sample_rate == 0 || self.stem_separation.sample_rate == 0 {
            anyhow::bail!("Sample rates must be non-zero");
        }
        if self.stem_separation.shifts == 0 {
            anyhow::bail!("stem_separation.shifts must be at least 1");
        }
        Ok(())
    }
}

fn check_bit_depth(bits: u16) -> Result<()> {
    match bits {
        16 | 24 | 32 => Ok(()),
        other => anyhow::bail!("unsupported bit depth {} (expected 16, 24 or 32)", other),
    }
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.audio_analysis.sample_rate, 48000);
        assert_eq!(config.audio_analysis.bit_depth, 16);
        assert_eq!(config.stem_separation.model_name, "htdemucs");
        assert_eq!(config.stem_separation.device, Device::Cpu);
        assert_eq!(config.stem_separation.shifts, 1);
        assert!(config.musicbrainz.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "stem_separation": { "model_name": "4stems", "device": "cuda" } }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.stem_separation.model_name, "4stems");
        assert_eq!(config.stem_separation.device, Device::Cuda);
        assert_eq!(config.stem_separation.sample_rate, 44100);
        assert_eq!(config.audio_analysis.max_bpm, 180.0);
    }

    #[test]
    fn test_rejects_bad_bit_depth() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "audio_analysis": { "bit_depth": 12 } }"#).unwrap();

        assert!(AppConfig::load(&path).is_err());
    }

    #[test]
    fn test_rejects_narrow_bpm_range() {
        let mut config = AppConfig::default();
        config.audio_analysis.min_bpm = 100.0;
        config.audio_analysis.max_bpm = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::default()
            .with_model("htdemucs_6s")
            .with_shifts(3)
            .with_fingerprinting(false);
        assert_eq!(config.stem_separation.model_name, "htdemucs_6s");
        assert_eq!(config.stem_separation.shifts, 3);
        assert!(!config.musicbrainz.enabled);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(AppConfig::load(Path::new("/nonexistent/stemprep.json")).is_err());
    }
}
