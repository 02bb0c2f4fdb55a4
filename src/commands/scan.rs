//! Input directory scanning

use crate::audio;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Audio files directly in `dir` (or below it when `recursive`) matching
/// `accept`, in path order
pub fn scan_dir(dir: &Path, recursive: bool, accept: fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Input directory does not exist: {:?}", dir);
    }

    let walker = if recursive {
        WalkDir::new(dir)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files = Vec::new();
    for entry in walker.sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {:?}", dir))?;
        let path = entry.path();
        if entry.file_type().is_file() && !is_hidden(path) && accept(path) {
            log::debug!("Discovered: {:?}", path);
            files.push(path.to_path_buf());
        }
    }

    log::info!("Discovered {} audio files in {:?}", files.len(), dir);
    if files.is_empty() {
        log::warn!("No supported audio files found in {:?}", dir);
    }
    Ok(files)
}

/// Every decodable audio file
pub fn scan_audio(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    scan_dir(dir, recursive, audio::is_supported)
}

/// WAV files only
pub fn scan_wav(dir: &Path) -> Result<Vec<PathBuf>> {
    scan_dir(dir, false, audio::is_wav)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("b.mp3"));
        touch(&dir.path().join("a.WAV"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join(".hidden.wav"));
        touch(&dir.path().join("sub").join("c.flac"));

        let files = scan_audio(dir.path(), false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.WAV", "b.mp3"]);

        let files = scan_audio(dir.path(), true).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_scan_wav_only() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("a.wav"));
        touch(&dir.path().join("b.flac"));

        let files = scan_wav(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a.wav")]);
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(scan_audio(Path::new("/nonexistent/music"), false).is_err());
    }
}
