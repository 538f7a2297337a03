//! Best-effort relay of room state changes to the bot endpoint

use crate::events::RoomEvent;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a single notification attempt
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Notification endpoint answered {0}")]
    Status(reqwest::StatusCode),
}

/// Sink for room notifications
///
/// Implementations must swallow their own failures: the return type carries
/// nothing the dispatcher could act on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, room_id: i64, event: RoomEvent);
}

/// Posts `roomid`/`event` form fields to a fixed URL
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one POST without retry
    pub async fn post_event(&self, room_id: i64, event: RoomEvent) -> Result<(), NotifyError> {
        let room = room_id.to_string();
        let form = [("roomid", room.as_str()), ("event", event.as_str())];

        let response = self.client.post(&self.endpoint).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, room_id: i64, event: RoomEvent) {
        match self.post_event(room_id, event).await {
            Ok(()) => debug!(room_id, event = %event, "notification delivered"),
            Err(e) => warn!(room_id, event = %event, "Error: {}", e),
        }
    }
}
