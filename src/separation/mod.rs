//! Neural stem separation
//!
//! Model inference goes through ONNX Runtime when built with the `onnx`
//! feature. Everything around it (segmenting, overlap-add, shift averaging,
//! output naming) is backend independent and works with any `StemModel`.

pub mod chunking;
pub mod locate;
pub mod models;
mod onnx;
mod separator;

pub use locate::locate_model;
pub use models::{available_models, find_model, ModelSpec, MODELS};
pub use onnx::OnnxStemModel;
pub use separator::{collect_stems, StemModel, StemSeparationResult, StemSeparator};

use crate::config::StemSeparationConfig;
use crate::error::StemError;

/// Resolve, locate and load the configured model
pub fn load_model(config: &StemSeparationConfig) -> Result<OnnxStemModel, StemError> {
    let spec = find_model(&config.model_name)?;
    if !onnx::ENABLED {
        return Err(StemError::Unavailable(
            "this build has no ONNX Runtime support (rebuild with `--features onnx`)".to_string(),
        ));
    }

    let path = locate_model(spec, config.model_override().as_deref())?;
    OnnxStemModel::load(spec, &path, config.device)
}
