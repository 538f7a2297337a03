//! External transcoder invocation

pub mod ffmpeg;

pub use ffmpeg::{
    build_ffmpeg_command, output_path_for, report_env_value, run_ffmpeg, FfmpegParams,
    FfmpegTranscoder, TranscodeError, Transcoder, OUTPUT_SUFFIX,
};
