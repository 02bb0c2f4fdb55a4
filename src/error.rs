//! Typed errors for the places where callers branch on the failure kind
//!
//! Everything else flows through `anyhow` with context attached at the
//! command layer.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the stem separation stage
#[derive(Debug, Error)]
pub enum StemError {
    #[error("stem separation unavailable: {0}")]
    Unavailable(String),

    #[error("unknown separation model '{name}' (available: {available})")]
    UnknownModel { name: String, available: String },

    #[error("model file for '{model}' not found; checked:\n{checked}")]
    ModelNotFound { model: String, checked: String },

    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("model returned unexpected output shape {shape:?}: {reason}")]
    ShapeMismatch { shape: Vec<i64>, reason: String },

    #[error("failed to write stem '{stem}' to {path:?}: {reason}")]
    Write {
        stem: String,
        path: PathBuf,
        reason: String,
    },
}

/// Failures of the fingerprint / MusicBrainz lookup stage
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("fpcalc not found at '{0}' (install chromaprint or set musicbrainz.fpcalc_path)")]
    ToolMissing(PathBuf),

    #[error("fpcalc failed for {path:?}: {reason}")]
    ToolFailed { path: PathBuf, reason: String },

    #[error("AcoustID lookup failed: {0}")]
    Lookup(String),

    #[error("no AcoustID API key configured (set ACOUSTID_API_KEY)")]
    NoApiKey,
}

impl FingerprintError {
    /// Errors that mean fingerprinting cannot work for any file in this run
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            FingerprintError::ToolMissing(_) | FingerprintError::NoApiKey
        )
    }
}
