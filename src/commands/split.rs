//! `split`: separate named tracks into stems
//!
//! Input `artist_songname_bpm_key.wav` becomes
//! `artist_songname_bpm_key_<stem>.wav` for each model stem, plus an
//! `artist_songname_bpm_key.stems.json` sidecar.

use super::{file_label, file_progress, resolve_output_dir, scan, scanning_spinner, Outcome, RunSummary};
use crate::config::AppConfig;
use crate::metadata::{is_stem_name, TrackName};
use crate::report::{self, StemReport};
use crate::separation::{self, find_model, StemModel, StemSeparator};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct SplitArgs {
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub dry_run: bool,
}

impl SplitArgs {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }
}

/// Run `split` with the configured ONNX model
pub fn run(args: &SplitArgs, config: &AppConfig) -> Result<RunSummary> {
    let spec = find_model(&config.stem_separation.model_name)?;
    if args.dry_run {
        return plan(args, config, spec.stems);
    }

    let model = separation::load_model(&config.stem_separation)?;
    run_with(args, config, model)
}

/// Run `split` with any model
pub fn run_with<M: StemModel>(args: &SplitArgs, config: &AppConfig, model: M) -> Result<RunSummary> {
    let output_dir = output_dir(args, config);
    let spec = *model.spec();
    let stem_config = &config.stem_separation;

    log::info!("Splitting audio files in: {:?}", args.input_dir);
    log::info!("Output directory: {:?}", output_dir);
    log::info!("Using model: {} ({} stems)", spec.name, spec.stem_count());

    let files = scan_inputs(&args.input_dir)?;
    let mut separator = StemSeparator::new(model, &output_dir)?
        .with_shifts(stem_config.shifts)
        .with_output_format(stem_config.sample_rate, stem_config.bit_depth);

    let pb = file_progress(files.len());
    let mut summary = RunSummary::default();
    for path in &files {
        pb.set_message(file_label(path));
        let outcome = split_file(&mut separator, path, stem_config.shifts);
        if let Err(e) = &outcome {
            log::error!("Failed to split {:?}: {:#}", path, e);
        }
        summary.record(&outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    summary.log("split");
    Ok(summary)
}

fn split_file<M: StemModel>(
    separator: &mut StemSeparator<M>,
    path: &Path,
    shifts: u32,
) -> Result<Outcome> {
    let spec = *separator.model_spec();
    let base = base_name(path)?;

    if is_stem_name(&base, spec.stems) {
        log::debug!("Skipping stem file {:?}", path);
        return Ok(Outcome::Skipped);
    }
    if TrackName::parse(&base).is_none() {
        log::warn!(
            "{:?} does not follow the artist_songname_bpm_key naming; splitting anyway",
            path
        );
    }

    let result = separator
        .separate_with_prefix(path, Some(&base))
        .with_context(|| format!("Stem separation failed for {:?}", path))?;

    if result.stems.len() != spec.stem_count() {
        anyhow::bail!(
            "Only {} of {} stems were written for {:?}",
            result.stems.len(),
            spec.stem_count(),
            path
        );
    }

    let sidecar = separator.output_dir().join(format!("{}.stems.json", base));
    report::write_json(&sidecar, &StemReport::new(spec.name, shifts, &result))?;

    log::info!("Split {:?} into {} stems", path, result.stems.len());
    Ok(Outcome::Succeeded)
}

/// Log the stem files a real run would write
fn plan(args: &SplitArgs, config: &AppConfig, stems: &[&str]) -> Result<RunSummary> {
    let output_dir = output_dir(args, config);
    let files = scan_inputs(&args.input_dir)?;

    let mut summary = RunSummary::default();
    for path in &files {
        let outcome = base_name(path).map(|base| {
            if !is_stem_name(&base, stems) {
                for stem in stems {
                    let target = output_dir.join(crate::metadata::stem_file_name(&base, stem));
                    log::info!("[dry run] {:?} -> {:?}", path, target);
                }
            }
            Outcome::Skipped
        });
        summary.record(&outcome);
    }
    summary.log("split (dry run)");
    Ok(summary)
}

fn output_dir(args: &SplitArgs, config: &AppConfig) -> PathBuf {
    resolve_output_dir(
        args.output_dir.as_deref(),
        config.stem_separation.output_dir.as_deref(),
        &args.input_dir,
    )
}

fn scan_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let spinner = scanning_spinner();
    let files = scan::scan_wav(dir);
    spinner.finish_and_clear();
    files
}

fn base_name(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .with_context(|| format!("No file name in {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{self, StereoBuffer};
    use crate::error::StemError;
    use crate::separation::ModelSpec;
    use std::fs;
    use tempfile::TempDir;

    /// First stem gets the whole mix, the rest are silent
    struct PassThrough(ModelSpec);

    impl PassThrough {
        fn new() -> Self {
            let mut spec = *find_model("htdemucs").unwrap();
            spec.segment_seconds = 0.5;
            spec.overlap_seconds = 0.1;
            Self(spec)
        }
    }

    impl StemModel for PassThrough {
        fn spec(&self) -> &ModelSpec {
            &self.0
        }

        fn infer(&mut self, segment: &StereoBuffer) -> Result<Vec<StereoBuffer>, StemError> {
            let mut stems = vec![segment.clone()];
            for _ in 1..self.0.stem_count() {
                stems.push(StereoBuffer::silent(segment.len(), segment.sample_rate));
            }
            Ok(stems)
        }
    }

    fn write_track(path: &Path) {
        let samples: Vec<f32> = (0..8820).map(|i| ((i as f32) * 0.03).sin() * 0.4).collect();
        audio::write_interleaved(path, &samples, 44100, 2, 16).unwrap();
    }

    #[test]
    fn test_splits_named_tracks() {
        let input = TempDir::new().unwrap();
        let output = input.path().join("stems");
        write_track(&input.path().join("artist_song_120_am.wav"));

        let args = SplitArgs {
            output_dir: Some(output.clone()),
            ..SplitArgs::new(input.path())
        };
        let summary = run_with(&args, &AppConfig::default(), PassThrough::new()).unwrap();
        assert_eq!(summary.succeeded, 1);

        for stem in ["vocals", "drums", "bass", "other"] {
            assert!(output.join(format!("artist_song_120_am_{}.wav", stem)).exists(), "{}", stem);
        }

        let sidecar: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(output.join("artist_song_120_am.stems.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar["model"], "htdemucs");
        assert_eq!(sidecar["stems"].as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_rerun_in_place_skips_stems() {
        let dir = TempDir::new().unwrap();
        write_track(&dir.path().join("artist_song_120_am.wav"));
        let args = SplitArgs::new(dir.path());

        let first = run_with(&args, &AppConfig::default(), PassThrough::new()).unwrap();
        assert_eq!(first.succeeded, 1);

        let second = run_with(&args, &AppConfig::default(), PassThrough::new()).unwrap();
        assert_eq!(second.total, 5);
        assert_eq!(second.succeeded, 1);
        assert_eq!(second.skipped, 4);
    }

    #[test]
    fn test_unnamed_track_still_splits() {
        let dir = TempDir::new().unwrap();
        write_track(&dir.path().join("Some Track.wav"));

        let summary = run_with(&SplitArgs::new(dir.path()), &AppConfig::default(), PassThrough::new())
            .unwrap();
        assert_eq!(summary.succeeded, 1);
        assert!(dir.path().join("Some Track_vocals.wav").exists());
    }

    #[test]
    fn test_dry_run_plans_only() {
        let dir = TempDir::new().unwrap();
        write_track(&dir.path().join("artist_song_120_am.wav"));
        let args = SplitArgs {
            dry_run: true,
            ..SplitArgs::new(dir.path())
        };

        let summary = run(&args, &AppConfig::default()).unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(!dir.path().join("artist_song_120_am_vocals.wav").exists());
    }

    #[test]
    fn test_unknown_model_fails_early() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::default().with_model("nope");
        assert!(run(&SplitArgs::new(dir.path()), &config).is_err());
    }

    #[test]
    fn test_rerun_with_collision_suffix_skips_stems() {
        let dir = TempDir::new().unwrap();
        write_track(&dir.path().join("unknown_x_124_am-2.wav"));
        let args = SplitArgs::new(dir.path());
        let config = AppConfig::default();

        let first = run_with(&args, &config, PassThrough::new()).unwrap();
        assert_eq!(first.succeeded, 1);
        assert!(dir.path().join("unknown_x_124_am-2_vocals.wav").exists());

        let second = run_with(&args, &config, PassThrough::new()).unwrap();
        assert_eq!(second.total, 5);
        assert_eq!(second.succeeded, 1);
        assert_eq!(second.skipped, 4);
        assert!(!dir.path().join("unknown_x_124_am-2_vocals_vocals.wav").exists());
    }
}
