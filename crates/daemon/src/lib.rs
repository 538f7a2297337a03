//! BililiveRecorder webhook daemon
//!
//! Relays recorder lifecycle events to a bot endpoint, queues finished
//! recordings for HEVC transcoding, and reports recorder liveness.

pub mod daemon;
pub mod dispatch;
pub mod events;
pub mod notify;
pub mod queue;
pub mod server;
pub mod startup;
pub mod status;
pub mod transcode;
pub mod worker;

pub use biliverec_hooks_config as config;
pub use biliverec_hooks_config::Config;
pub use daemon::{Daemon, DaemonError};
pub use dispatch::{DispatchOutcome, EventDispatcher};
pub use events::{EventData, EventType, RecorderEvent, RoomEvent};
pub use notify::{HttpNotifier, NotifyError, Notifier};
pub use queue::{handoff_queue, JobQueue, QueueError, QueueReceiver, QueueSender, TranscodeJob};
pub use server::{create_router, run_server, AppState, ServerError};
pub use startup::{
    check_ffmpeg_available, check_log_dir, ensure_report_dir, parse_ffmpeg_version,
    run_startup_checks, StartupError,
};
pub use status::{StatusError, StatusProbe, StatusReport};
pub use transcode::{
    build_ffmpeg_command, output_path_for, run_ffmpeg, FfmpegParams, FfmpegTranscoder,
    TranscodeError, Transcoder,
};
pub use worker::TranscodeWorker;
