//! ONNX Runtime backend for separation models
//!
//! Expects a model with one input of shape `[1, 2, frames]` and a first
//! output of shape `[1, stems, 2, frames]`.

use super::models::ModelSpec;
use super::separator::StemModel;
use crate::audio::StereoBuffer;
use crate::config::Device;
use crate::error::StemError;
use std::path::Path;

/// Whether this build can run separation models
pub const ENABLED: bool = cfg!(feature = "onnx");

#[cfg(feature = "onnx")]
pub struct OnnxStemModel {
    spec: &'static ModelSpec,
    session: ort::session::Session,
    input_name: String,
}

#[cfg(feature = "onnx")]
impl OnnxStemModel {
    /// Load model weights and create an inference session
    pub fn load(spec: &'static ModelSpec, path: &Path, device: Device) -> Result<Self, StemError> {
        log::info!("Loading model '{}' from {:?} ({:?})", spec.name, path, device);
        let session = create_session(path, device)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| StemError::Unavailable("model has no input tensors".to_string()))?;

        Ok(Self {
            spec,
            session,
            input_name,
        })
    }
}

#[cfg(feature = "onnx")]
fn create_session(path: &Path, device: Device) -> Result<ort::session::Session, StemError> {
    use ort::execution_providers::CPUExecutionProvider;
    use ort::session::Session;

    let builder = Session::builder()
        .map_err(|e| StemError::Unavailable(format!("failed to create session builder: {}", e)))?;

    let providers = match device {
        #[cfg(feature = "cuda")]
        Device::Cuda => {
            use ort::execution_providers::CUDAExecutionProvider;
            vec![
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ]
        }
        #[cfg(not(feature = "cuda"))]
        Device::Cuda => {
            log::warn!("Built without CUDA support, running the model on the CPU");
            vec![CPUExecutionProvider::default().build()]
        }
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
    };

    builder
        .with_execution_providers(providers)
        .map_err(|e| StemError::Unavailable(format!("failed to configure execution provider: {}", e)))?
        .commit_from_file(path)
        .map_err(|e| StemError::Unavailable(format!("failed to load model {:?}: {}", path, e)))
}

#[cfg(feature = "onnx")]
impl StemModel for OnnxStemModel {
    fn spec(&self) -> &ModelSpec {
        self.spec
    }

    fn infer(&mut self, segment: &StereoBuffer) -> Result<Vec<StereoBuffer>, StemError> {
        use ndarray::{s, Array3, ArrayView1};
        use ort::value::Tensor;

        let frames = segment.len();
        let mut input = Array3::<f32>::zeros((1, 2, frames));
        input
            .slice_mut(s![0, 0, ..])
            .assign(&ArrayView1::from(&segment.left));
        input
            .slice_mut(s![0, 1, ..])
            .assign(&ArrayView1::from(&segment.right));

        let tensor = Tensor::from_array(input)
            .map_err(|e| StemError::Inference(format!("failed to create input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| StemError::Inference(e.to_string()))?;

        let output = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| StemError::Inference("model produced no outputs".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| StemError::Inference(format!("failed to extract output: {}", e)))?;
        let shape: Vec<i64> = shape.iter().copied().collect();

        split_output(&shape, data, self.spec.stem_count(), segment.sample_rate)
    }
}

/// Stub used when the crate is built without the `onnx` feature
#[cfg(not(feature = "onnx"))]
pub struct OnnxStemModel {
    spec: &'static ModelSpec,
}

#[cfg(not(feature = "onnx"))]
impl OnnxStemModel {
    pub fn load(spec: &'static ModelSpec, path: &Path, device: Device) -> Result<Self, StemError> {
        log::debug!(
            "Cannot load '{}' from {:?} on {:?}: built without ONNX support",
            spec.name,
            path,
            device
        );
        Err(unavailable())
    }
}

#[cfg(not(feature = "onnx"))]
impl StemModel for OnnxStemModel {
    fn spec(&self) -> &ModelSpec {
        self.spec
    }

    fn infer(&mut self, _segment: &StereoBuffer) -> Result<Vec<StereoBuffer>, StemError> {
        Err(unavailable())
    }
}

#[cfg(not(feature = "onnx"))]
fn unavailable() -> StemError {
    StemError::Unavailable("rebuild with `--features onnx` to enable stem separation".to_string())
}

/// Split a `[1, stems, 2, frames]` row-major tensor into per-stem buffers
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
fn split_output(
    shape: &[i64],
    data: &[f32],
    expected_stems: usize,
    sample_rate: u32,
) -> Result<Vec<StereoBuffer>, StemError> {
    let mismatch = |reason: String| StemError::ShapeMismatch {
        shape: shape.to_vec(),
        reason,
    };

    if shape.len() != 4 {
        return Err(mismatch(format!("expected 4 dimensions, got {}", shape.len())));
    }
    if shape.iter().any(|d| *d < 0) {
        return Err(mismatch("negative dimension".to_string()));
    }
    if shape[0] != 1 {
        return Err(mismatch(format!("expected batch size 1, got {}", shape[0])));
    }
    if shape[1] as usize != expected_stems {
        return Err(mismatch(format!("expected {} stems, got {}", expected_stems, shape[1])));
    }
    if shape[2] != 2 {
        return Err(mismatch(format!("expected 2 channels, got {}", shape[2])));
    }

    let frames = shape[3] as usize;
    let expected_len = expected_stems
        .checked_mul(2)
        .and_then(|v| v.checked_mul(frames))
        .ok_or_else(|| mismatch("tensor size overflows".to_string()))?;
    if data.len() != expected_len {
        return Err(mismatch(format!(
            "buffer holds {} values, shape needs {}",
            data.len(),
            expected_len
        )));
    }

    Ok(data
        .chunks_exact(2 * frames.max(1))
        .take(expected_stems)
        .map(|stem| {
            let (left, right) = stem.split_at(frames);
            StereoBuffer::new(left.to_vec(), right.to_vec(), sample_rate)
        })
        .collect())
}
