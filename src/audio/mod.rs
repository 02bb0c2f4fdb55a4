//! Audio I/O: decoding through symphonia, WAV output through hound

pub mod decode;
pub mod resample;
pub mod wav;

pub use decode::{decode, DecodedAudio, StereoBuffer};
pub use wav::{write_interleaved, write_stereo};

/// File extensions the decoder is built to handle
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "flac", "mp3", "ogg"];

/// Whether a path has one of the supported audio extensions
pub fn is_supported(path: &std::path::Path) -> bool {
    has_extension(path, SUPPORTED_EXTENSIONS)
}

/// Whether a path is a WAV file
pub fn is_wav(path: &std::path::Path) -> bool {
    has_extension(path, &["wav"])
}

fn has_extension(path: &std::path::Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_extension_matching_is_case_insensitive() {
        assert!(is_supported(Path::new("a/b/Track.WAV")));
        assert!(is_supported(Path::new("song.flac")));
        assert!(!is_supported(Path::new("cover.jpg")));
        assert!(!is_supported(Path::new("noext")));
        assert!(is_wav(Path::new("x.Wav")));
        assert!(!is_wav(Path::new("x.mp3")));
    }
}
