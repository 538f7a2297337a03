//! Single transcode worker
//!
//! Claims one job at a time and runs it to completion before claiming the
//! next. A failed job is logged and dropped; the loop itself never stops
//! until the queue closes.

use crate::queue::{QueueReceiver, TranscodeJob};
use crate::transcode::Transcoder;
use std::sync::Arc;
use tracing::{error, info};

pub struct TranscodeWorker<T: Transcoder> {
    transcoder: Arc<T>,
}

impl<T: Transcoder> TranscodeWorker<T> {
    pub fn new(transcoder: T) -> Self {
        Self {
            transcoder: Arc::new(transcoder),
        }
    }

    /// Drain the queue until every sender is gone
    pub async fn run(self, mut queue: QueueReceiver) {
        while let Some(job) = queue.claim().await {
            self.process(job).await;
        }
        info!("Transcode queue closed, worker exiting");
    }

    /// Transcode one job on the blocking pool and log the outcome
    pub async fn process(&self, job: TranscodeJob) {
        let transcoder = self.transcoder.clone();
        let input = job.input_path.clone();

        let result =
            tokio::task::spawn_blocking(move || transcoder.transcode(&job.input_path)).await;

        match result {
            Ok(Ok(output)) => info!("Transcode finished: {}", output.display()),
            Ok(Err(e)) => error!(input = %input.display(), "Error: {}", e),
            Err(e) => error!(input = %input.display(), "Transcode task panicked: {}", e),
        }
    }
}
