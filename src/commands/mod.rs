//! The `analyze` and `split` commands
//!
//! Each command scans an input directory and processes files one by one.
//! A failing file is logged and counted; it never stops the run.

pub mod analyze;
pub mod output;
pub mod scan;
pub mod split;

pub use analyze::AnalyzeArgs;
pub use split::SplitArgs;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of one processed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Skipped,
}

/// Per-run counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn record<E>(&mut self, outcome: &Result<Outcome, E>) {
        self.total += 1;
        match outcome {
            Ok(Outcome::Succeeded) => self.succeeded += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// 0 when every file succeeded or was skipped, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }

    pub fn log(&self, command: &str) {
        log::info!(
            "{} finished: {} files, {} succeeded, {} failed, {} skipped",
            command,
            self.total,
            self.succeeded,
            self.failed,
            self.skipped
        );
    }
}

/// Command-line value, then config value, then the input directory
pub fn resolve_output_dir(
    cli: Option<&Path>,
    configured: Option<&Path>,
    input_dir: &Path,
) -> PathBuf {
    cli.or(configured).unwrap_or(input_dir).to_path_buf()
}

pub(crate) fn scanning_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Scanning input directory...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub(crate) fn file_progress(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
