use std::collections::BTreeSet;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;
use stemprep::analysis::AnalysisOptions;
use stemprep::audio::StereoBuffer;
use stemprep::commands::analyze;
use stemprep::error::StemError;
use stemprep::metadata::TrackName;
use stemprep::separation::{find_model, ModelSpec};
use stemprep::{AnalyzeArgs, AppConfig, AudioAnalyzer, StemModel, StemSeparator, StratumAnalyzer};
use tempfile::TempDir;

const RATE: u32 = 44100;

/// 120 BPM kick clicks over a sustained A minor triad
fn write_click_track(path: &Path, seconds: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();

    let beat = (RATE as f32 * 60.0 / 120.0) as usize;
    let click_len = RATE as usize / 50;
    let chord = [220.0f32, 261.63, 329.63];

    for i in 0..(RATE * seconds) as usize {
        let t = i as f32 / RATE as f32;
        let pad: f32 = chord.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() * 0.1;
        let pos = i % beat;
        let click = if pos < click_len {
            let env = 1.0 - pos as f32 / click_len as f32;
            (2.0 * PI * 60.0 * t).sin() * env * 0.6
        } else {
            0.0
        };
        let v = ((pad + click).clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(v).unwrap();
        writer.write_sample(v).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_click_track_analysis() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("click.wav");
    write_click_track(&path, 20);

    let features = StratumAnalyzer::new().analyze_file(&path).unwrap();

    assert_eq!(features.path, path);
    let bpm = features.bpm().expect("bpm detected");
    assert!(bpm.is_finite() && bpm > 0.0);
    assert!((70.0..=180.0).contains(&bpm), "bpm {} outside folding range", bpm);
    assert!(!features.key.is_empty());
    assert!((0.0..=1.0).contains(&features.confidence));
    assert!((features.duration_seconds - 20.0).abs() < 0.1);
    assert!(features.qualitative.is_some());
}

#[test]
fn test_skip_flags_leave_fields_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("click.wav");
    write_click_track(&path, 3);

    let analyzer =
        StratumAnalyzer::new().with_options(AnalysisOptions::from_skips(true, true, true));
    let features = analyzer.analyze_file(&path).unwrap();

    assert_eq!(features.path, path);
    assert_eq!(features.bpm(), None);
    assert_eq!(features.key(), None);
    assert_eq!(features.confidence, 0.0);
    assert!(features.qualitative.is_none());
}

#[test]
fn test_analyze_command_renames_and_writes_sidecar() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_click_track(&input.path().join("Demo Track.wav"), 20);

    let args = AnalyzeArgs {
        output_dir: Some(output.path().to_path_buf()),
        skip_fingerprinting: true,
        ..AnalyzeArgs::new(input.path())
    };
    let summary = analyze::run(&args, &AppConfig::default()).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.exit_code(), 0);

    let wavs: Vec<_> = fs::read_dir(output.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map(|e| e == "wav").unwrap_or(false))
        .collect();
    assert_eq!(wavs.len(), 1);

    let base = wavs[0].file_stem().unwrap().to_str().unwrap();
    let name = TrackName::parse(base).expect("artist_songname_bpm_key name");
    assert_eq!(name.artist, "unknown");
    assert_eq!(name.title, "demo-track");
    assert!(name.bpm.is_some());

    let sidecar: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(wavs[0].with_extension("json")).unwrap())
            .unwrap();
    assert_eq!(sidecar["title"], "Demo Track");
    assert!(sidecar["features"]["bpm"].as_f64().unwrap() > 0.0);
    assert_eq!(
        sidecar["source_file"].as_str().unwrap(),
        input.path().join("Demo Track.wav").to_str().unwrap()
    );
}

#[test]
fn test_analyze_skipping_everything_uses_unknown_fields() {
    let dir = TempDir::new().unwrap();
    write_click_track(&dir.path().join("intro.wav"), 2);

    let args = AnalyzeArgs {
        skip_fingerprinting: true,
        skip_bpm: true,
        skip_key: true,
        skip_qualitative: true,
        ..AnalyzeArgs::new(dir.path())
    };
    let summary = analyze::run(&args, &AppConfig::default()).unwrap();
    assert_eq!(summary.succeeded, 1);

    // renamed in place
    assert!(!dir.path().join("intro.wav").exists());
    assert!(dir.path().join("unknown_intro_unknown_unknown.wav").exists());
    assert!(dir.path().join("unknown_intro_unknown_unknown.json").exists());
}

/// Splits the mix evenly across the model's stems
struct EvenSplit(ModelSpec);

impl StemModel for EvenSplit {
    fn spec(&self) -> &ModelSpec {
        &self.0
    }

    fn infer(&mut self, segment: &StereoBuffer) -> Result<Vec<StereoBuffer>, StemError> {
        let n = self.0.stem_count() as f32;
        let share = |s: &Vec<f32>| s.iter().map(|v| v / n).collect::<Vec<f32>>();
        Ok((0..self.0.stem_count())
            .map(|_| StereoBuffer::new(share(&segment.left), share(&segment.right), segment.sample_rate))
            .collect())
    }
}

#[test]
fn test_separation_result_matches_model() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("artist_song_120_am.wav");
    write_click_track(&input, 2);
    let out = dir.path().join("stems");

    for model in ["htdemucs", "htdemucs_6s", "2stems"] {
        let spec = *find_model(model).unwrap();
        let mut separator = StemSeparator::new(EvenSplit(spec), &out).unwrap();
        let result = separator.separate(&input).unwrap();

        assert_eq!(result.input_file, input);
        assert_eq!(result.output_dir, out);
        let got: BTreeSet<&str> = result.stems.keys().map(|k| k.as_str()).collect();
        let expected: BTreeSet<&str> = spec.stems.iter().copied().collect();
        assert_eq!(got, expected, "{}", model);
        assert!(result.stems.values().all(|p| p.exists()));
    }
}
