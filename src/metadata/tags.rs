//! Embedded tag reading via lofty

use anyhow::{Context, Result};
use lofty::prelude::*;
use lofty::probe::Probe;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Descriptive tags read from an audio file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTags {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
}

impl TrackTags {
    pub fn is_empty(&self) -> bool {
        self.artist.is_none() && self.title.is_none() && self.album.is_none() && self.genre.is_none()
    }
}

/// Read tags, preferring the file's primary tag type
pub fn read_tags(path: &Path) -> Result<TrackTags> {
    let tagged_file = Probe::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?
        .read()
        .with_context(|| format!("Failed to read tags from: {}", path.display()))?;

    let tag = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(t) => t,
        None => return Ok(TrackTags::default()),
    };

    Ok(TrackTags {
        artist: clean(tag.artist()),
        title: clean(tag.title()),
        album: clean(tag.album()),
        genre: clean(tag.genre()),
    })
}

/// Read tags, treating unreadable files as untagged
pub fn read_tags_or_default(path: &Path) -> TrackTags {
    match read_tags(path) {
        Ok(tags) => tags,
        Err(e) => {
            log::debug!("No tags for {:?}: {:#}", path, e);
            TrackTags::default()
        }
    }
}

fn clean(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
