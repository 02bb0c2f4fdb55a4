//! Track identity: embedded tags, fingerprint lookups and output naming

pub mod fingerprint;
pub mod naming;
pub mod tags;

pub use fingerprint::{Fingerprinter, MusicBrainzMatch};
pub use naming::{is_stem_name, sanitize_component, stem_file_name, TrackName};
pub use tags::{read_tags, read_tags_or_default, TrackTags};

use std::path::Path;

/// Artist and title for a track
///
/// A MusicBrainz match wins over embedded tags. Without either, a file
/// already named `artist_songname_bpm_key` keeps its artist and title, and
/// any other file stem stands in for the title.
pub fn resolve_identity(
    path: &Path,
    tags: &TrackTags,
    mb: Option<&MusicBrainzMatch>,
) -> (String, String) {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
    let named = stem.as_deref().and_then(TrackName::parse);

    let artist = mb
        .and_then(|m| m.artist.clone())
        .or_else(|| tags.artist.clone())
        .or_else(|| named.as_ref().map(|n| n.artist.clone()))
        .unwrap_or_else(|| naming::UNKNOWN.to_string());

    let title = mb
        .and_then(|m| m.title.clone())
        .or_else(|| tags.title.clone())
        .or_else(|| named.map(|n| n.title))
        .or(stem)
        .unwrap_or_else(|| naming::UNKNOWN.to_string());

    (artist, title)
}
