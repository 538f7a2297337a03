//! Daemon startup and main loop
//!
//! Wires the notifier, hand-off queue, transcode worker, status probe and
//! HTTP server together from a loaded [`Config`].

use crate::config::{Config, ConfigError};
use crate::dispatch::EventDispatcher;
use crate::notify::HttpNotifier;
use crate::queue::{handoff_queue, QueueReceiver, QueueSender};
use crate::server::{run_server, AppState, ServerError};
use crate::startup::run_startup_checks;
use crate::status::StatusProbe;
use crate::transcode::FfmpegTranscoder;
use crate::worker::TranscodeWorker;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Error type for daemon operations
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server error
    #[error("{0}")]
    Server(#[from] ServerError),
}

/// Daemon state containing all runtime components
pub struct Daemon {
    /// Configuration, fixed for the life of the process
    pub config: Config,
    /// Producer side of the transcode queue
    queue_tx: QueueSender,
    /// Consumer side, taken by the worker when it starts
    queue_rx: Option<QueueReceiver>,
}

impl Daemon {
    /// Initialize the daemon with an existing configuration
    pub fn new(config: Config) -> Self {
        let (queue_tx, queue_rx) = handoff_queue();
        Self {
            config,
            queue_tx,
            queue_rx: Some(queue_rx),
        }
    }

    /// Initialize the daemon with configuration from file and environment
    pub fn from_config_file<P: AsRef<Path>>(config_path: P) -> Result<Self, DaemonError> {
        let config = Config::load(config_path)?;
        Ok(Self::new(config))
    }

    /// Get a clone of the queue sender for external job submission
    pub fn queue_sender(&self) -> QueueSender {
        self.queue_tx.clone()
    }

    /// Handler state for the HTTP server
    pub fn app_state(&self) -> AppState {
        let notifier = Arc::new(HttpNotifier::new(self.config.notify.bot_api.clone()));
        let dispatcher = EventDispatcher::new(
            self.config.paths.base_dir.clone(),
            notifier,
            Arc::new(self.queue_tx.clone()),
        );

        AppState {
            dispatcher: Arc::new(dispatcher),
            status: Arc::new(StatusProbe::new(self.config.paths.log_dir.clone())),
        }
    }

    /// Spawn the transcode worker
    ///
    /// Returns `None` if the worker was already started; there is only ever one.
    pub fn start_worker(&mut self) -> Option<tokio::task::JoinHandle<()>> {
        let queue_rx = self.queue_rx.take()?;
        let transcoder = FfmpegTranscoder::new(
            self.config.transcode.ffmpeg_path.clone(),
            self.config.ffmpeg_log_dir(),
        );
        Some(tokio::spawn(TranscodeWorker::new(transcoder).run(queue_rx)))
    }

    /// Run the daemon: optional preflight, the worker, then the server
    ///
    /// Only returns on a server failure such as an unbindable address.
    pub async fn run(mut self, run_checks: bool) -> Result<(), DaemonError> {
        if run_checks {
            run_startup_checks(&self.config);
        }

        let _worker_handle = self.start_worker();

        info!(
            base_dir = %self.config.paths.base_dir.display(),
            log_dir = %self.config.paths.log_dir.display(),
            bot_api = %self.config.notify.bot_api,
            "Daemon initialized"
        );

        let state = self.app_state();
        run_server(&self.config.listen_addr(), state).await?;
        Ok(())
    }
}
