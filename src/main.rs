use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use stemprep::commands::{analyze, split};
use stemprep::error::StemError;
use stemprep::{AnalyzeArgs, AppConfig, RunSummary, SplitArgs};

const EXIT_FAILURE: u8 = 1;
/// Bad configuration or an unknown model name
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "stemprep", version)]
#[command(about = "Audio analysis, metadata extraction and stem separation", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze tracks and rename them to artist_songname_bpm_key.wav
    #[command(alias = "analyse")]
    Analyze(AnalyzeCommand),

    /// Split tracks into stems named artist_songname_bpm_key_stemname.wav
    Split(SplitCommand),
}

#[derive(Args, Debug)]
struct AnalyzeCommand {
    /// Directory containing audio files
    #[arg(value_parser = existing_dir)]
    input_dir: PathBuf,

    /// Directory to save analyzed files (defaults to INPUT_DIR)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Skip MusicBrainz fingerprinting for metadata
    #[arg(long)]
    skip_fingerprinting: bool,

    /// Skip BPM analysis
    #[arg(long)]
    skip_bpm: bool,

    /// Skip key detection
    #[arg(long)]
    skip_key: bool,

    /// Skip qualitative feature extraction (loudness, energy)
    #[arg(long)]
    skip_qualitative: bool,

    /// Descend into subdirectories
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Number of parallel workers (default: all cores)
    #[arg(short = 'j', long, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: Option<u16>,

    /// Show planned names without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct SplitCommand {
    /// Directory containing artist_songname_bpm_key.wav files
    #[arg(value_parser = existing_dir)]
    input_dir: PathBuf,

    /// Directory to save stem files (defaults to INPUT_DIR)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Separation model (htdemucs, htdemucs_ft, htdemucs_6s, mdx_extra, 2stems, 4stems, 5stems)
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Explicit model file (.onnx or .ort)
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Number of time-shifted passes to average
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=20))]
    shifts: Option<u32>,

    /// Show planned stem files without running the model
    #[arg(long)]
    dry_run: bool,
}

fn existing_dir(raw: &str) -> Result<PathBuf, String> {
    let path = stemprep::config::expand_path(&PathBuf::from(raw));
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("'{}' is not an existing directory", raw))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let result = match &cli.command {
        Command::Analyze(cmd) => analyze::run(&analyze_args(cmd), &config),
        Command::Split(cmd) => split::run(&split_args(cmd), &config),
    };

    if let Err(e) = &result {
        log::error!("{:#}", e);
    }
    ExitCode::from(exit_status(&result))
}

/// Process exit status for a finished command
fn exit_status(result: &Result<RunSummary>) -> u8 {
    match result {
        Ok(summary) => summary.exit_code() as u8,
        Err(e) => match e.downcast_ref::<StemError>() {
            Some(StemError::UnknownModel { .. }) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        },
    }
}

/// Defaults, then the config file, then command-line overrides
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Command::Analyze(cmd) => {
            if cmd.skip_fingerprinting {
                config = config.with_fingerprinting(false);
            }
        }
        Command::Split(cmd) => {
            if let Some(model) = &cmd.model {
                config = config.with_model(model.clone());
            }
            if let Some(path) = &cmd.model_path {
                config = config.with_model_path(path.clone());
            }
            if let Some(shifts) = cmd.shifts {
                config = config.with_shifts(shifts);
            }
        }
    }

    config.validate()?;
    Ok(config)
}

fn analyze_args(cmd: &AnalyzeCommand) -> AnalyzeArgs {
    AnalyzeArgs {
        input_dir: cmd.input_dir.clone(),
        output_dir: cmd.output_dir.clone(),
        skip_fingerprinting: cmd.skip_fingerprinting,
        skip_bpm: cmd.skip_bpm,
        skip_key: cmd.skip_key,
        skip_qualitative: cmd.skip_qualitative,
        recursive: cmd.recursive,
        jobs: cmd.jobs.map(usize::from),
        dry_run: cmd.dry_run,
    }
}

fn split_args(cmd: &SplitCommand) -> SplitArgs {
    SplitArgs {
        input_dir: cmd.input_dir.clone(),
        output_dir: cmd.output_dir.clone(),
        dry_run: cmd.dry_run,
    }
}
