//! Known separation models and the stems they produce

use crate::error::StemError;

/// Static description of a separation model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    /// Name used on the command line and in config files
    pub name: &'static str,
    /// Output stems in the order the model emits them
    pub stems: &'static [&'static str],
    /// Sample rate the model runs at
    pub sample_rate: u32,
    /// Input segment length in seconds
    pub segment_seconds: f32,
    /// Overlap between consecutive segments in seconds
    pub overlap_seconds: f32,
}

const FOUR_STEMS: &[&str] = &["vocals", "drums", "bass", "other"];

pub const MODELS: &[ModelSpec] = &[
    ModelSpec {
        name: "htdemucs",
        stems: FOUR_STEMS,
        sample_rate: 44100,
        segment_seconds: 7.8,
        overlap_seconds: 1.0,
    },
    ModelSpec {
        name: "htdemucs_ft",
        stems: FOUR_STEMS,
        sample_rate: 44100,
        segment_seconds: 7.8,
        overlap_seconds: 1.0,
    },
    ModelSpec {
        name: "htdemucs_6s",
        stems: &["vocals", "drums", "bass", "guitar", "piano", "other"],
        sample_rate: 44100,
        segment_seconds: 7.8,
        overlap_seconds: 1.0,
    },
    ModelSpec {
        name: "mdx_extra",
        stems: FOUR_STEMS,
        sample_rate: 44100,
        segment_seconds: 10.0,
        overlap_seconds: 1.0,
    },
    ModelSpec {
        name: "2stems",
        stems: &["vocals", "accompaniment"],
        sample_rate: 44100,
        segment_seconds: 10.0,
        overlap_seconds: 1.0,
    },
    ModelSpec {
        name: "4stems",
        stems: FOUR_STEMS,
        sample_rate: 44100,
        segment_seconds: 10.0,
        overlap_seconds: 1.0,
    },
    ModelSpec {
        name: "5stems",
        stems: &["vocals", "drums", "bass", "piano", "other"],
        sample_rate: 44100,
        segment_seconds: 10.0,
        overlap_seconds: 1.0,
    },
];

/// Look up a model by name (case-insensitive)
pub fn find_model(name: &str) -> Result<&'static ModelSpec, StemError> {
    MODELS
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| StemError::UnknownModel {
            name: name.to_string(),
            available: available_models(),
        })
}

/// Comma-separated list of model names
pub fn available_models() -> String {
    MODELS.iter().map(|m| m.name).collect::<Vec<_>>().join(", ")
}

impl ModelSpec {
    pub fn stem_count(&self) -> usize {
        self.stems.len()
    }

    /// Candidate file names for this model's weights
    pub fn file_names(&self) -> [String; 2] {
        [format!("{}.onnx", self.name), format!("{}.ort", self.name)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_models() {
        assert_eq!(find_model("htdemucs").unwrap().stem_count(), 4);
        assert_eq!(find_model("HTDemucs_6s").unwrap().stem_count(), 6);
        assert_eq!(
            find_model("2stems").unwrap().stems,
            &["vocals", "accompaniment"]
        );
    }

    #[test]
    fn test_unknown_model() {
        match find_model("spleeter:9stems") {
            Err(StemError::UnknownModel { name, available }) => {
                assert_eq!(name, "spleeter:9stems");
                assert!(available.contains("htdemucs"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_every_model_ends_with_a_residual_stem() {
        for model in MODELS {
            let last = model.stems.last().unwrap();
            assert!(*last == "other" || *last == "accompaniment", "{}", model.name);
            assert!(model.overlap_seconds < model.segment_seconds);
        }
    }

    #[test]
    fn test_file_names() {
        let spec = find_model("htdemucs").unwrap();
        assert_eq!(spec.file_names(), ["htdemucs.onnx".to_string(), "htdemucs.ort".to_string()]);
    }
}
