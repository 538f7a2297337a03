//! Hand-off queue between event dispatch and the transcode worker
//!
//! Any number of request handlers may submit; exactly one receiver claims.
//! `submit` resolves only once the worker has taken the job, so a handler
//! waits for the worker to become free, the same way an unbuffered channel
//! would behave. Jobs are claimed strictly in submission order.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors returned to a submitter
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The worker side is gone; the job was not and will not be processed
    #[error("Transcode queue is closed")]
    Closed,
}

/// A finished recording awaiting transcoding
///
/// Has no identity beyond its path; the same path may be queued twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub input_path: PathBuf,
}

impl TranscodeJob {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }
}

/// Producer side of the transcode queue
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Admit a job, returning once a consumer has claimed it
    async fn submit(&self, job: TranscodeJob) -> Result<(), QueueError>;
}

struct Handoff {
    job: TranscodeJob,
    claimed: oneshot::Sender<()>,
}

/// Cloneable submitting handle
#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<Handoff>,
}

/// The single consuming handle; deliberately not `Clone`
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<Handoff>,
}

/// Create a connected sender/receiver pair
pub fn handoff_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueSender { tx }, QueueReceiver { rx })
}

#[async_trait]
impl JobQueue for QueueSender {
    async fn submit(&self, job: TranscodeJob) -> Result<(), QueueError> {
        let (claimed_tx, claimed_rx) = oneshot::channel();
        self.tx
            .send(Handoff {
                job,
                claimed: claimed_tx,
            })
            .map_err(|_| QueueError::Closed)?;

        // Dropped unclaimed when the receiver goes away with the job still queued
        claimed_rx.await.map_err(|_| QueueError::Closed)
    }
}

impl QueueReceiver {
    /// Wait for the next job
    ///
    /// Returns `None` once every sender has been dropped and the queue is drained.
    pub async fn claim(&mut self) -> Option<TranscodeJob> {
        let handoff = self.rx.recv().await?;
        // The submitter may have stopped waiting; the job is still ours
        let _ = handoff.claimed.send(());
        Some(handoff.job)
    }
}
