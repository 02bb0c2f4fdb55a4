//! stemprep - prepare tracks for DJ use
//!
//! Analyzes audio files for tempo, key and loudness, renames them to
//! `artist_songname_bpm_key.wav` with a JSON sidecar, and splits them into
//! instrument stems with a neural separation model.

pub mod analysis;
pub mod audio;
pub mod commands;
pub mod config;
pub mod error;
pub mod metadata;
pub mod report;
pub mod separation;

pub use analysis::{AudioAnalyzer, AudioFeatures, StratumAnalyzer};
pub use commands::{AnalyzeArgs, RunSummary, SplitArgs};
pub use config::AppConfig;
pub use separation::{StemModel, StemSeparationResult, StemSeparator};
