//! Model file resolution
//!
//! Search order:
//! 1. explicit path (`--model-path`, `stem_separation.model_path` or
//!    `STEMPREP_MODEL_PATH`)
//! 2. project cache dir, e.g. `~/.cache/stemprep/models/`
//! 3. project data dir, e.g. `~/.local/share/stemprep/models/`
//! 4. `./models/`

use super::models::ModelSpec;
use crate::error::StemError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Directories searched for model files, in order
pub fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(proj_dirs) = ProjectDirs::from("", "", env!("CARGO_PKG_NAME")) {
        dirs.push(proj_dirs.cache_dir().join("models"));
        dirs.push(proj_dirs.data_dir().join("models"));
    }
    dirs.push(PathBuf::from("./models"));
    dirs
}

/// Find the weights for `spec`
pub fn locate_model(spec: &ModelSpec, explicit: Option<&Path>) -> Result<PathBuf, StemError> {
    locate_in(spec, explicit, &search_dirs())
}

/// Find the weights for `spec` in the given directories
pub fn locate_in(
    spec: &ModelSpec,
    explicit: Option<&Path>,
    dirs: &[PathBuf],
) -> Result<PathBuf, StemError> {
    let mut checked: Vec<String> = Vec::new();

    if let Some(path) = explicit {
        if path.is_file() {
            log::debug!("Using explicit model file {:?}", path);
            return Ok(path.to_path_buf());
        }
        checked.push(path.display().to_string());
    }

    for dir in dirs {
        for file_name in spec.file_names() {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                log::debug!("Found model '{}' at {:?}", spec.name, candidate);
                return Ok(candidate);
            }
            checked.push(candidate.display().to_string());
        }
    }

    Err(StemError::ModelNotFound {
        model: spec.name.to_string(),
        checked: checked
            .iter()
            .map(|c| format!("  - {}", c))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::separation::models::find_model;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("custom.onnx");
        std::fs::write(&model, b"weights").unwrap();

        let spec = find_model("htdemucs").unwrap();
        let found = locate_in(spec, Some(&model), &[]).unwrap();
        assert_eq!(found, model);
    }

    #[test]
    fn test_search_dirs_in_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(second.path().join("htdemucs.ort"), b"weights").unwrap();

        let spec = find_model("htdemucs").unwrap();
        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let found = locate_in(spec, None, &dirs).unwrap();
        assert_eq!(found, second.path().join("htdemucs.ort"));

        std::fs::write(first.path().join("htdemucs.onnx"), b"weights").unwrap();
        let found = locate_in(spec, None, &dirs).unwrap();
        assert_eq!(found, first.path().join("htdemucs.onnx"));
    }

    #[test]
    fn test_not_found_lists_locations() {
        let dir = TempDir::new().unwrap();
        let spec = find_model("4stems").unwrap();
        let missing = dir.path().join("nope.onnx");

        match locate_in(spec, Some(&missing), &[dir.path().to_path_buf()]) {
            Err(StemError::ModelNotFound { model, checked }) => {
                assert_eq!(model, "4stems");
                assert!(checked.contains("nope.onnx"));
                assert!(checked.contains("4stems.onnx"));
                assert!(checked.contains("4stems.ort"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
