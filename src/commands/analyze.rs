//! `analyze`: identify, measure and rename tracks
//!
//! Every supported file in the input directory ends up in the output
//! directory as `artist_songname_bpm_key.wav` with a JSON sidecar of the
//! same base name.

use super::output::OutputOrganizer;
use super::{file_label, file_progress, resolve_output_dir, scan, scanning_spinner, Outcome, RunSummary};
use crate::analysis::{AnalysisOptions, AudioAnalyzer, MusicalKey, StratumAnalyzer};
use crate::config::AppConfig;
use crate::metadata::{self, is_stem_name, Fingerprinter, TrackName};
use crate::report::{self, AnalysisReport};
use crate::separation::models::MODELS;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub skip_fingerprinting: bool,
    pub skip_bpm: bool,
    pub skip_key: bool,
    pub skip_qualitative: bool,
    pub recursive: bool,
    /// Worker threads; all cores when unset
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

impl AnalyzeArgs {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }

    pub fn options(&self) -> AnalysisOptions {
        AnalysisOptions::from_skips(self.skip_bpm, self.skip_key, self.skip_qualitative)
    }
}

/// Run `analyze` with the stratum-dsp backend
pub fn run(args: &AnalyzeArgs, config: &AppConfig) -> Result<RunSummary> {
    let analyzer = StratumAnalyzer::from_config(&config.audio_analysis).with_options(args.options());
    run_with(args, config, &analyzer)
}

/// Run `analyze` with any analyzer
pub fn run_with<A: AudioAnalyzer + Sync>(
    args: &AnalyzeArgs,
    config: &AppConfig,
    analyzer: &A,
) -> Result<RunSummary> {
    let output_dir = resolve_output_dir(
        args.output_dir.as_deref(),
        config.audio_analysis.output_dir.as_deref(),
        &args.input_dir,
    );

    log::info!("Analyzing audio files in: {:?}", args.input_dir);
    log::info!("Output directory: {:?}", output_dir);

    let fingerprinter = if args.skip_fingerprinting || !config.musicbrainz.enabled {
        None
    } else {
        init_fingerprinter(config)
    };
    log_enabled_features(&args.options(), fingerprinter.is_some(), analyzer.name());

    let spinner = scanning_spinner();
    let files = scan::scan_audio(&args.input_dir, args.recursive);
    spinner.finish_and_clear();
    let files = files?;

    let organizer = if args.dry_run {
        OutputOrganizer::plan(&args.input_dir, &output_dir)
    } else {
        OutputOrganizer::new(&args.input_dir, &output_dir)?
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()
        .context("Failed to build worker thread pool")?;
    log::debug!("Analyzing with {} worker threads", pool.current_num_threads());

    let job = Job {
        config,
        analyzer,
        fingerprinter: fingerprinter.as_ref(),
        organizer: &organizer,
        dry_run: args.dry_run,
    };

    let pb = file_progress(files.len());
    let outcomes: Vec<Result<Outcome>> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let outcome = job.process(path);
                if let Err(e) = &outcome {
                    log::error!("Failed to analyze {:?}: {:#}", path, e);
                }
                pb.inc(1);
                pb.set_message(file_label(path));
                outcome
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut summary = RunSummary::default();
    for outcome in &outcomes {
        summary.record(outcome);
    }
    summary.log("analyze");
    Ok(summary)
}

/// Fingerprinter if fpcalc and an API key are available
fn init_fingerprinter(config: &AppConfig) -> Option<Fingerprinter> {
    let fingerprinter = match Fingerprinter::from_config(&config.musicbrainz) {
        Ok(f) => f,
        Err(e) => {
            log::warn!("Fingerprinting disabled: {}", e);
            return None;
        }
    };

    if let Err(e) = fingerprinter.check_tool() {
        log::warn!("Fingerprinting disabled: {}", e);
        return None;
    }
    if !fingerprinter.has_api_key() {
        log::warn!("Fingerprinting disabled: {}", crate::error::FingerprintError::NoApiKey);
        return None;
    }
    Some(fingerprinter)
}

fn log_enabled_features(options: &AnalysisOptions, fingerprinting: bool, backend: &str) {
    let mut enabled = Vec::new();
    if fingerprinting {
        enabled.push("MusicBrainz");
    }
    if options.bpm {
        enabled.push("BPM");
    }
    if options.key {
        enabled.push("Key");
    }
    if options.qualitative {
        enabled.push("Qualitative");
    }
    if enabled.is_empty() {
        log::info!("Analysis features: none");
    } else {
        log::info!("Analysis features: {} ({})", enabled.join(" "), backend);
    }
}

struct Job<'a, A> {
    config: &'a AppConfig,
    analyzer: &'a A,
    fingerprinter: Option<&'a Fingerprinter>,
    organizer: &'a OutputOrganizer,
    dry_run: bool,
}

impl<A: AudioAnalyzer + Sync> Job<'_, A> {
    fn process(&self, path: &Path) -> Result<Outcome> {
        if is_stem_file(path) {
            log::debug!("Skipping stem file {:?}", path);
            return Ok(Outcome::Skipped);
        }

        log::debug!("Processing {:?}", path);
        let tags = metadata::read_tags_or_default(path);

        let musicbrainz = match self.fingerprinter {
            Some(fp) => match fp.identify(path) {
                Ok(found) => found,
                Err(e) => {
                    log::warn!("Fingerprint lookup failed for {:?}: {}", path, e);
                    None
                }
            },
            None => None,
        };

        let features = self
            .analyzer
            .analyze_file(path)
            .with_context(|| format!("Failed to analyze track: {:?}", path))?;

        let (artist, title) = metadata::resolve_identity(path, &tags, musicbrainz.as_ref());
        let key = features.key().and_then(|k| k.parse::<MusicalKey>().ok());
        let name = TrackName::new(&artist, &title, features.bpm(), key);
        let dest = self.organizer.reserve(&name.to_string(), path);

        if self.dry_run {
            log::info!("[dry run] {:?} -> {:?}", path, dest);
            return Ok(Outcome::Skipped);
        }

        let placement = self
            .organizer
            .place(path, &dest, &self.config.audio_analysis)?;

        let report = AnalysisReport::new(
            path,
            &dest,
            &artist,
            &title,
            &tags,
            musicbrainz,
            &features,
        );
        report::write_json(&dest.with_extension("json"), &report)?;

        log::info!("{:?} -> {:?} ({:?})", path, dest, placement);
        Ok(Outcome::Succeeded)
    }
}

/// Stem written by `split` for any known model
fn is_stem_file(path: &Path) -> bool {
    match path.file_stem() {
        Some(stem) => {
            let base = stem.to_string_lossy();
            MODELS.iter().any(|m| is_stem_name(&base, m.stems))
        }
        None => false,
    }
}
