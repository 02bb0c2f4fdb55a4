//! JSON sidecar files written next to analyzed tracks and stems

use crate::analysis::{AudioFeatures, QualitativeFeatures};
use crate::metadata::{MusicBrainzMatch, TrackTags};
use crate::separation::StemSeparationResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Bumped whenever a sidecar field changes meaning
pub const SCHEMA_VERSION: u32 = 1;

fn generator() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Sidecar for an analyzed track: `<name>.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: u32,
    pub generator: String,
    pub analyzed_at: DateTime<Utc>,
    pub source_file: PathBuf,
    pub output_file: PathBuf,
    pub artist: String,
    pub title: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub musicbrainz: Option<MusicBrainzMatch>,
    pub features: FeatureReport,
}

/// Analysis results as stored in the sidecar
///
/// Skipped analyses are `null` rather than zero or empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureReport {
    pub bpm: Option<f64>,
    pub bpm_confidence: Option<f64>,
    pub key: Option<String>,
    pub key_confidence: Option<f64>,
    pub camelot: Option<String>,
    pub confidence: f64,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub qualitative: Option<QualitativeFeatures>,
}

impl FeatureReport {
    pub fn from_features(features: &AudioFeatures) -> Self {
        Self {
            bpm: features.bpm(),
            bpm_confidence: features.bpm_confidence,
            key: features.key().map(str::to_string),
            key_confidence: features.key_confidence,
            camelot: features.camelot.clone(),
            confidence: features.confidence,
            duration_seconds: features.duration_seconds,
            sample_rate: features.sample_rate,
            channels: features.channels,
            qualitative: features.qualitative.clone(),
        }
    }
}

impl AnalysisReport {
    pub fn new(
        source_file: &Path,
        output_file: &Path,
        artist: &str,
        title: &str,
        tags: &TrackTags,
        musicbrainz: Option<MusicBrainzMatch>,
        features: &AudioFeatures,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generator: generator(),
            analyzed_at: Utc::now(),
            source_file: source_file.to_path_buf(),
            output_file: output_file.to_path_buf(),
            artist: artist.to_string(),
            title: title.to_string(),
            album: tags.album.clone(),
            genre: tags.genre.clone(),
            musicbrainz,
            features: FeatureReport::from_features(features),
        }
    }
}

/// Sidecar for a separated track: `<input stem>.stems.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemReport {
    pub schema_version: u32,
    pub generator: String,
    pub separated_at: DateTime<Utc>,
    pub source_file: PathBuf,
    pub model: String,
    pub shifts: u32,
    pub output_dir: PathBuf,
    pub stems: BTreeMap<String, PathBuf>,
}

impl StemReport {
    pub fn new(model: &str, shifts: u32, result: &StemSeparationResult) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generator: generator(),
            separated_at: Utc::now(),
            source_file: result.input_file.clone(),
            model: model.to_string(),
            shifts,
            output_dir: result.output_dir.clone(),
            stems: result.stems.clone(),
        }
    }
}

/// Write any sidecar as pretty-printed JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize sidecar")?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write sidecar: {:?}", path))?;
    log::debug!("Wrote sidecar {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn features() -> AudioFeatures {
        let mut f = AudioFeatures::empty(PathBuf::from("/in/a.wav"), 12.5, 44100, 2);
        f.bpm = 128.0;
        f.bpm_confidence = Some(0.8);
        f.confidence = 0.8;
        f
    }

    #[test]
    fn test_analysis_report_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let tags = TrackTags {
            album: Some("Album".to_string()),
            ..TrackTags::default()
        };
        let report = AnalysisReport::new(
            Path::new("/in/a.wav"),
            Path::new("/out/x_y_128_unknown.wav"),
            "X",
            "Y",
            &tags,
            None,
            &features(),
        );
        write_json(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["artist"], "X");
        assert_eq!(value["album"], "Album");
        assert_eq!(value["features"]["bpm"], 128.0);
        assert!(value["features"]["key"].is_null());
        assert!(value["musicbrainz"].is_null());
        assert!(value["analyzed_at"].as_str().unwrap().contains('T'));

        let back: AnalysisReport = serde_json::from_value(value).unwrap();
        assert_eq!(back.output_file, PathBuf::from("/out/x_y_128_unknown.wav"));
    }

    #[test]
    fn test_stem_report() {
        let mut stems = BTreeMap::new();
        stems.insert("vocals".to_string(), PathBuf::from("/out/t_vocals.wav"));
        let result = StemSeparationResult {
            input_file: PathBuf::from("/in/t.wav"),
            output_dir: PathBuf::from("/out"),
            stems,
        };

        let report = StemReport::new("htdemucs", 2, &result);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["model"], "htdemucs");
        assert_eq!(value["shifts"], 2);
        assert_eq!(value["stems"]["vocals"], "/out/t_vocals.wav");
        assert_eq!(value["source_file"], "/in/t.wav");
    }
}
