//! Qualitative features computed directly from samples
//!
//! Loudness, dynamics and an energy rating. These are cheap time-domain
//! measures; nothing here needs a spectral transform.

use serde::{Deserialize, Serialize};

/// Floor for all decibel values
pub const SILENCE_DB: f64 = -120.0;

const FRAME_SIZE: usize = 2048;

// rms_db mapped linearly onto the energy scale between these bounds
const ENERGY_FLOOR_DB: f64 = -50.0;
const ENERGY_CEIL_DB: f64 = -8.0;

/// Coarse energy rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeFeatures {
    /// Overall RMS level in dBFS
    pub rms_db: f64,

    /// Sample peak in dBFS
    pub peak_db: f64,

    /// Peak-to-RMS ratio in dB
    pub crest_factor_db: f64,

    /// Spread between loud (95th percentile) and quiet (10th percentile)
    /// frames in dB
    pub dynamic_range_db: f64,

    /// Sign changes per second
    pub zero_crossing_rate: f64,

    /// Energy rating in [0, 1]
    pub energy: f64,

    pub energy_level: EnergyLevel,
}

/// Compute qualitative features for mono samples
pub fn extract(samples: &[f32], sample_rate: u32) -> QualitativeFeatures {
    let overall_rms = rms(samples);
    let peak = samples.iter().fold(0.0f64, |m, s| m.max(s.abs() as f64));

    let rms_db = to_db(overall_rms);
    let peak_db = to_db(peak);
    let crest_factor_db = if overall_rms > 0.0 { peak_db - rms_db } else { 0.0 };

    let mut frame_levels: Vec<f64> = samples
        .chunks(FRAME_SIZE)
        .filter(|f| f.len() == FRAME_SIZE)
        .map(|f| to_db(rms(f)))
        .filter(|db| *db > SILENCE_DB)
        .collect();
    frame_levels.sort_by(|a, b| a.total_cmp(b));

    let dynamic_range_db = if frame_levels.len() >= 2 {
        percentile(&frame_levels, 0.95) - percentile(&frame_levels, 0.10)
    } else {
        0.0
    };

    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    let zero_crossing_rate = if samples.is_empty() || sample_rate == 0 {
        0.0
    } else {
        crossings as f64 * sample_rate as f64 / samples.len() as f64
    };

    let energy = ((rms_db - ENERGY_FLOOR_DB) / (ENERGY_CEIL_DB - ENERGY_FLOOR_DB)).clamp(0.0, 1.0);
    let energy_level = if energy < 0.33 {
        EnergyLevel::Low
    } else if energy < 0.66 {
        EnergyLevel::Medium
    } else {
        EnergyLevel::High
    };

    QualitativeFeatures {
        rms_db,
        peak_db,
        crest_factor_db,
        dynamic_range_db,
        zero_crossing_rate,
        energy,
        energy_level,
    }
}

fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

fn to_db(amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * amplitude.log10()).max(SILENCE_DB)
}

// `sorted` must be ascending and non-empty
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
