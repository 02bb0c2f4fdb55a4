//! Audio analysis layer
//!
//! Analysis is reached through the `AudioAnalyzer` trait so the backend can
//! be swapped. BPM and key detection are powered by stratum-dsp.

pub mod key;
pub mod qualitative;
mod stratum;
mod traits;

pub use key::MusicalKey;
pub use qualitative::{EnergyLevel, QualitativeFeatures};
pub use stratum::{fold_bpm, StratumAnalyzer};
pub use traits::{AnalysisOptions, AudioAnalyzer, AudioFeatures};
