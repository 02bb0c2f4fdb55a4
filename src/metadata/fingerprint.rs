//! Acoustic fingerprinting and MusicBrainz identification
//!
//! Fingerprints come from Chromaprint's `fpcalc` tool; identification goes
//! through the AcoustID web service, whose recordings are MusicBrainz
//! recording ids.

use crate::config::MusicBrainzConfig;
use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

const ACOUSTID_LOOKUP_URL: &str = "https://api.acoustid.org/v2/lookup";

/// Chromaprint fingerprint of a file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Fingerprint {
    pub duration: f64,
    pub fingerprint: String,
}

/// Best recording match for a fingerprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicBrainzMatch {
    /// AcoustID match score in [0, 1]
    pub score: f64,
    pub acoustid: String,
    pub recording_id: String,
    pub artist: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: String,
    #[serde(default)]
    results: Vec<LookupResult>,
    error: Option<LookupError>,
}

#[derive(Debug, Deserialize)]
struct LookupError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    id: String,
    score: f64,
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    id: String,
    title: Option<String>,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
    joinphrase: Option<String>,
}

/// Runs fpcalc and queries AcoustID
pub struct Fingerprinter {
    fpcalc: PathBuf,
    api_key: Option<String>,
    min_score: f64,
    client: reqwest::blocking::Client,
}

impl Fingerprinter {
    pub fn from_config(config: &MusicBrainzConfig) -> Result<Self, FingerprintError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FingerprintError::Lookup(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            fpcalc: config.fpcalc(),
            api_key: config.api_key(),
            min_score: config.min_score,
            client,
        })
    }

    /// Check that fpcalc can be executed at all
    pub fn check_tool(&self) -> Result<(), FingerprintError> {
        match Command::new(&self.fpcalc).arg("-version").output() {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FingerprintError::ToolMissing(self.fpcalc.clone()))
            }
            Err(e) => Err(FingerprintError::ToolFailed {
                path: self.fpcalc.clone(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Compute the Chromaprint fingerprint of a file
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        log::debug!("Fingerprinting {:?} with {:?}", path, self.fpcalc);

        let output = Command::new(&self.fpcalc)
            .arg("-json")
            .arg(path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FingerprintError::ToolMissing(self.fpcalc.clone()),
                _ => FingerprintError::ToolFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                },
            })?;

        if !output.status.success() {
            return Err(FingerprintError::ToolFailed {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_fpcalc_output(&String::from_utf8_lossy(&output.stdout)).map_err(|reason| {
            FingerprintError::ToolFailed {
                path: path.to_path_buf(),
                reason,
            }
        })
    }

    /// Look up a fingerprint on AcoustID
    pub fn lookup(&self, fp: &Fingerprint) -> Result<Option<MusicBrainzMatch>, FingerprintError> {
        let api_key = self.api_key.as_deref().ok_or(FingerprintError::NoApiKey)?;

        let duration = (fp.duration.round() as u64).to_string();
        let params = [
            ("client", api_key),
            ("meta", "recordings"),
            ("duration", duration.as_str()),
            ("fingerprint", fp.fingerprint.as_str()),
        ];

        let body = self
            .client
            .post(ACOUSTID_LOOKUP_URL)
            .form(&params)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.text())
            .map_err(|e| FingerprintError::Lookup(e.to_string()))?;

        parse_lookup_response(&body, self.min_score)
    }

    /// Fingerprint a file and look it up
    pub fn identify(&self, path: &Path) -> Result<Option<MusicBrainzMatch>, FingerprintError> {
        let fp = self.fingerprint(path)?;
        let found = self.lookup(&fp)?;
        match &found {
            Some(m) => log::info!(
                "MusicBrainz match for {:?}: {} - {} (score {:.2})",
                path,
                m.artist.as_deref().unwrap_or("?"),
                m.title.as_deref().unwrap_or("?"),
                m.score
            ),
            None => log::info!("No MusicBrainz match for {:?}", path),
        }
        Ok(found)
    }
}

/// Parse `fpcalc -json` output
pub fn parse_fpcalc_output(stdout: &str) -> Result<Fingerprint, String> {
    let fp: Fingerprint =
        serde_json::from_str(stdout.trim()).map_err(|e| format!("unexpected fpcalc output: {}", e))?;
    if fp.fingerprint.is_empty() {
        return Err("fpcalc returned an empty fingerprint".to_string());
    }
    Ok(fp)
}

/// Pick the best recording from an AcoustID lookup response
///
/// Results below `min_score` or without any recording are ignored.
pub fn parse_lookup_response(
    body: &str,
    min_score: f64,
) -> Result<Option<MusicBrainzMatch>, FingerprintError> {
    let response: LookupResponse = serde_json::from_str(body)
        .map_err(|e| FingerprintError::Lookup(format!("invalid response: {}", e)))?;

    if response.status != "ok" {
        let message = response
            .error
            .map(|e| e.message)
            .unwrap_or_else(|| format!("status '{}'", response.status));
        return Err(FingerprintError::Lookup(message));
    }

    let best = response
        .results
        .into_iter()
        .filter(|r| r.score >= min_score && !r.recordings.is_empty())
        .max_by(|a, b| a.score.total_cmp(&b.score));

    Ok(best.map(|result| {
        let score = result.score;
        let acoustid = result.id;
        // Prefer a recording that carries both artist and title
        let mut recordings = result.recordings;
        let idx = recordings
            .iter()
            .position(|r| r.title.is_some() && !r.artists.is_empty())
            .unwrap_or(0);
        let recording = recordings.swap_remove(idx);

        MusicBrainzMatch {
            score,
            acoustid,
            artist: join_artists(&recording.artists),
            title: recording.title,
            recording_id: recording.id,
        }
    }))
}

fn join_artists(artists: &[Artist]) -> Option<String> {
    if artists.is_empty() {
        return None;
    }
    let mut out = String::new();
    for (i, artist) in artists.iter().enumerate() {
        out.push_str(&artist.name);
        if i + 1 < artists.len() {
            out.push_str(artist.joinphrase.as_deref().unwrap_or(", "));
        }
    }
    Some(out)
}
