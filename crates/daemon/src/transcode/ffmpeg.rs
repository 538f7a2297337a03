//! FFmpeg HEVC transcoding
//!
//! Builds and runs an FFmpeg command with a fixed argument set: libx265 video
//! in 10-bit 4:2:0, audio stream copy, and a per-run report file under the
//! configured report directory.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Appended to the input stem to form the output file name
pub const OUTPUT_SUFFIX: &str = "-hevc.mp4";

/// Error type for transcoding operations
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// FFmpeg process exited with non-zero status
    #[error("FFmpeg failed with exit code: {0}")]
    FfmpegFailed(i32),

    /// FFmpeg process was terminated by signal
    #[error("FFmpeg process was terminated by signal")]
    FfmpegTerminated,

    /// FFmpeg could not be launched
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Derive the output path: strip the last extension of the file name, append [`OUTPUT_SUFFIX`]
///
/// `a/b/test.flv` becomes `a/b/test-hevc.mp4`; `noext` becomes `noext-hevc.mp4`.
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(OUTPUT_SUFFIX);
    input.with_file_name(name)
}

/// Value for the `FFREPORT` environment variable
///
/// FFmpeg expands `%p` to the program name and pid and `%t` to a timestamp.
pub fn report_env_value(report_dir: &Path) -> String {
    format!("file={}/%p-%t.log:level=32", report_dir.display())
}

/// Parameters for a single transcoding run
#[derive(Debug, Clone)]
pub struct FfmpegParams {
    /// Path to the finished recording
    pub input_path: PathBuf,
    /// Path for the transcoded output file
    pub output_path: PathBuf,
    /// Directory receiving the FFmpeg report for this run
    pub report_dir: PathBuf,
}

impl FfmpegParams {
    /// Parameters for `input_path` with the derived output path
    pub fn for_input(input_path: PathBuf, report_dir: PathBuf) -> Self {
        let output_path = output_path_for(&input_path);
        Self {
            input_path,
            output_path,
            report_dir,
        }
    }
}

/// Build an FFmpeg command with all required transcoding flags
pub fn build_ffmpeg_command(program: &Path, params: &FfmpegParams) -> Command {
    let mut cmd = Command::new(program);

    cmd.arg("-nostdin");
    cmd.arg("-loglevel").arg("quiet");
    cmd.arg("-i").arg(&params.input_path);

    cmd.arg("-c:v").arg("libx265");
    cmd.arg("-x265-params").arg("log-level=none");
    cmd.arg("-pix_fmt").arg("yuv420p10le");
    // Lets Apple players recognise HEVC in MP4
    cmd.arg("-tag:v").arg("hvc1");
    cmd.arg("-max_muxing_queue_size").arg("4096");
    cmd.arg("-c:a").arg("copy");

    cmd.arg(&params.output_path);

    cmd.env("FFREPORT", report_env_value(&params.report_dir));

    cmd
}

/// Execute a transcoding run, blocking until FFmpeg exits
pub fn run_ffmpeg(program: &Path, params: &FfmpegParams) -> Result<(), TranscodeError> {
    let mut cmd = build_ffmpeg_command(program, params);

    let status = cmd.status()?;

    if status.success() {
        Ok(())
    } else {
        match status.code() {
            Some(code) => Err(TranscodeError::FfmpegFailed(code)),
            None => Err(TranscodeError::FfmpegTerminated),
        }
    }
}

/// Something that turns a finished recording into a transcoded file
///
/// Calls block for the full duration of the transcode.
pub trait Transcoder: Send + Sync + 'static {
    /// Transcode `input`, returning the output path on success
    fn transcode(&self, input: &Path) -> Result<PathBuf, TranscodeError>;
}

/// [`Transcoder`] backed by an FFmpeg executable
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    report_dir: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: PathBuf, report_dir: PathBuf) -> Self {
        Self {
            program,
            report_dir,
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path) -> Result<PathBuf, TranscodeError> {
        let params = FfmpegParams::for_input(input.to_path_buf(), self.report_dir.clone());
        run_ffmpeg(&self.program, &params)?;
        Ok(params.output_path)
    }
}
