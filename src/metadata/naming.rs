//! Output file naming: `artist_songname_bpm_key`
//!
//! `_` separates the four fields, so it never appears inside one.

use crate::analysis::MusicalKey;
use std::fmt;

/// Placeholder for fields that could not be determined
pub const UNKNOWN: &str = "unknown";

/// Parsed or constructed track base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackName {
    pub artist: String,
    pub title: String,
    pub bpm: Option<u32>,
    pub key: Option<MusicalKey>,
}

impl TrackName {
    /// Build a name from raw values, sanitizing each component
    pub fn new(artist: &str, title: &str, bpm: Option<f64>, key: Option<MusicalKey>) -> Self {
        Self {
            artist: sanitize_component(artist),
            title: sanitize_component(title),
            bpm: bpm.filter(|b| b.is_finite() && *b > 0.0).map(|b| b.round() as u32),
            key,
        }
    }

    /// Parse a base name (without extension) produced by `Display`
    ///
    /// A trailing collision suffix (`artist_song_120_am-2`) is accepted and
    /// dropped.
    pub fn parse(base: &str) -> Option<Self> {
        let parts: Vec<&str> = strip_collision_suffix(base).split('_').collect();
        if parts.len() != 4 || parts[0].is_empty() || parts[1].is_empty() {
            return None;
        }

        let bpm = match parts[2] {
            UNKNOWN => None,
            b => Some(b.parse::<u32>().ok()?),
        };
        let key = match parts[3] {
            UNKNOWN => None,
            k => Some(k.parse::<MusicalKey>().ok()?),
        };

        Some(Self {
            artist: parts[0].to_string(),
            title: parts[1].to_string(),
            bpm,
            key,
        })
    }
}

impl fmt::Display for TrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bpm = self
            .bpm
            .map(|b| b.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let key = self
            .key
            .map(|k| k.file_token())
            .unwrap_or_else(|| UNKNOWN.to_string());
        write!(f, "{}_{}_{}_{}", self.artist, self.title, bpm, key)
    }
}

/// Lowercase a name component, turning runs of anything but letters and
/// digits into a single '-'
pub fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else if c == '\'' {
            // "don't" -> "dont"
        } else {
            pending_dash = true;
        }
    }

    if out.is_empty() {
        UNKNOWN.to_string()
    } else {
        out
    }
}

fn strip_collision_suffix(base: &str) -> &str {
    match base.rsplit_once('-') {
        Some((rest, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => rest,
        _ => base,
    }
}

/// Whether `base` is `<track name>_<stem>` for one of `stems`
pub fn is_stem_name(base: &str, stems: &[&str]) -> bool {
    stems.iter().any(|stem| {
        base.strip_suffix(stem)
            .and_then(|rest| rest.strip_suffix('_'))
            .map(|track| TrackName::parse(track).is_some())
            .unwrap_or(false)
    })
}

/// File name of one stem: `base_stemname.wav`
pub fn stem_file_name(base: &str, stem: &str) -> String {
    format!("{}_{}.wav", base, sanitize_component(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_component("Daft Punk"), "daft-punk");
        assert_eq!(sanitize_component("  AC/DC  "), "ac-dc");
        assert_eq!(sanitize_component("Don't Stop_Me"), "dont-stop-me");
        assert_eq!(sanitize_component("Sigur Rós"), "sigur-rós");
        assert_eq!(sanitize_component("!!!"), UNKNOWN);
        assert_eq!(sanitize_component(""), UNKNOWN);
    }

    #[test]
    fn test_display() {
        let name = TrackName::new("Daft Punk", "One More Time", Some(122.6), Some(MusicalKey::FsMinor));
        assert_eq!(name.to_string(), "daft-punk_one-more-time_123_fsm");

        let unknown = TrackName::new("", "Intro", None, None);
        assert_eq!(unknown.to_string(), "unknown_intro_unknown_unknown");
    }

    #[test]
    fn test_parse_back() {
        let name = TrackName::new("Artist", "Song Name", Some(128.0), Some(MusicalKey::AMinor));
        let parsed = TrackName::parse(&name.to_string()).unwrap();
        assert_eq!(parsed, name);

        let partial = TrackName::parse("artist_song_unknown_eb").unwrap();
        assert_eq!(partial.bpm, None);
        assert_eq!(partial.key, Some(MusicalKey::EbMajor));
    }

    #[test]
    fn test_parse_rejects_other_names() {
        assert!(TrackName::parse("just-a-file").is_none());
        assert!(TrackName::parse("a_b_c").is_none());
        assert!(TrackName::parse("a_b_fast_am").is_none());
        assert!(TrackName::parse("a_b_120_h").is_none());
        assert!(TrackName::parse("a_b_120_am_extra").is_none());
    }

    #[test]
    fn test_parse_collision_suffix() {
        let parsed = TrackName::parse("unknown_x_124_am-2").unwrap();
        assert_eq!(parsed.title, "x");
        assert_eq!(parsed.bpm, Some(124));
        assert_eq!(parsed.key, Some(MusicalKey::AMinor));

        let unknown_key = TrackName::parse("artist_song_unknown_unknown-13").unwrap();
        assert_eq!(unknown_key.key, None);

        assert!(TrackName::parse("artist_song_120_am-").is_none());
        assert!(TrackName::parse("artist_song_120_am-x").is_none());
    }

    #[test]
    fn test_is_stem_name() {
        let stems = ["vocals", "accompaniment"];
        assert!(is_stem_name("artist_song_120_am_vocals", &stems));
        assert!(is_stem_name("unknown_x_124_am-2_accompaniment", &stems));
        assert!(!is_stem_name("artist_song_120_am", &stems));
        assert!(!is_stem_name("unknown_x_124_am-2", &stems));
        assert!(!is_stem_name("just_vocals", &stems));
    }

    #[test]
    fn test_stem_file_name() {
        assert_eq!(
            stem_file_name("artist_song_120_am", "vocals"),
            "artist_song_120_am_vocals.wav"
        );
    }
}
