//! Startup checks
//!
//! Preflight checks run before the server starts. None of them is fatal: a
//! missing transcoder only affects transcoding, and the recorder may create
//! its log directory later. Failures are logged as warnings.

use crate::config::Config;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{info, warn};

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("FFmpeg not available: {0}")]
    FfmpegUnavailable(String),

    #[error("Cannot create FFmpeg report directory {path}: {source}")]
    ReportDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Recorder log directory {path} is not readable: {source}")]
    LogDir {
        path: String,
        source: std::io::Error,
    },
}

/// Parse FFmpeg version string and extract major version number
///
/// Handles various FFmpeg version formats:
/// - Standard: "ffmpeg version 6.1 ..."
/// - N-prefixed: "ffmpeg version n6.1-... ..."
pub fn parse_ffmpeg_version(version_output: &str) -> Option<u32> {
    let version_line = version_output
        .lines()
        .find(|line| line.to_lowercase().contains("ffmpeg version"))?;

    let version_part = version_line
        .to_lowercase()
        .split("ffmpeg version")
        .nth(1)?
        .trim()
        .split_whitespace()
        .next()?
        .to_string();

    let version_str = version_part.trim_start_matches('n');

    // Major version ends at the first '.' or '-'
    let major_str = version_str.split(['.', '-']).next()?;

    major_str.parse().ok()
}

/// Check that the transcoder runs, returning its major version when it can be parsed
pub fn check_ffmpeg_available(program: &Path) -> Result<Option<u32>, StartupError> {
    let output = Command::new(program)
        .arg("-version")
        .output()
        .map_err(|e| {
            StartupError::FfmpegUnavailable(format!(
                "{} -version failed; is FFmpeg installed and in PATH? Error: {}",
                program.display(),
                e
            ))
        })?;

    if !output.status.success() {
        return Err(StartupError::FfmpegUnavailable(format!(
            "{} -version exited with {}",
            program.display(),
            output.status
        )));
    }

    let version_output = String::from_utf8_lossy(&output.stdout);
    Ok(parse_ffmpeg_version(&version_output))
}

/// Create the directory receiving per-run FFmpeg reports
pub fn ensure_report_dir(dir: &Path) -> Result<(), StartupError> {
    std::fs::create_dir_all(dir).map_err(|source| StartupError::ReportDir {
        path: dir.display().to_string(),
        source,
    })
}

/// Check the recorder log directory can be listed
pub fn check_log_dir(dir: &Path) -> Result<(), StartupError> {
    std::fs::read_dir(dir)
        .map(|_| ())
        .map_err(|source| StartupError::LogDir {
            path: dir.display().to_string(),
            source,
        })
}

/// Run all startup checks, logging each failure
///
/// Checks are run in the following order:
/// 1. FFmpeg availability
/// 2. FFmpeg report directory
/// 3. Recorder log directory
///
/// Returns the failures so callers can inspect them.
pub fn run_startup_checks(cfg: &Config) -> Vec<StartupError> {
    let mut failures = Vec::new();

    match check_ffmpeg_available(&cfg.transcode.ffmpeg_path) {
        Ok(Some(major)) => info!("Found FFmpeg {}.x", major),
        Ok(None) => info!("Found FFmpeg (unrecognised version banner)"),
        Err(e) => failures.push(e),
    }

    if let Err(e) = ensure_report_dir(&cfg.ffmpeg_log_dir()) {
        failures.push(e);
    }

    if let Err(e) = check_log_dir(&cfg.paths.log_dir) {
        failures.push(e);
    }

    for failure in &failures {
        warn!("Startup check failed: {}", failure);
    }

    failures
}
