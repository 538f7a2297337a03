//! Event dispatch
//!
//! Maps each recorder event to a room notification and, for closed files, to
//! transcode-queue admission. Dispatch keeps no state between events and does
//! not check that a room's events arrive in lifecycle order.

use crate::events::{EventType, RecorderEvent, RoomEvent};
use crate::notify::Notifier;
use crate::queue::{JobQueue, TranscodeJob};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// What a single dispatch did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Notification sent, if the event type has one
    pub notified: Option<RoomEvent>,
    /// Path handed to the worker, for closed files that were admitted
    pub enqueued: Option<PathBuf>,
}

pub struct EventDispatcher {
    base_dir: PathBuf,
    notifier: Arc<dyn Notifier>,
    queue: Arc<dyn JobQueue>,
}

impl EventDispatcher {
    pub fn new(base_dir: PathBuf, notifier: Arc<dyn Notifier>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            base_dir,
            notifier,
            queue,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute location of a recording reported relative to the work directory
    ///
    /// Leading separators are dropped so the result always stays under the base directory.
    pub fn resolve_recording_path(&self, relative_path: &str) -> PathBuf {
        self.base_dir
            .join(relative_path.trim_start_matches(['/', '\\']))
    }

    /// Handle one event
    ///
    /// For `FileClosed` this waits until the worker has claimed the job.
    pub async fn dispatch(&self, event: &RecorderEvent) -> DispatchOutcome {
        let data = &event.event_data;
        let room_id = data.room_id;
        let mut outcome = DispatchOutcome::default();

        match event.event_type {
            EventType::SessionStarted => {
                info!("<{}> online.", room_id);
            }
            EventType::FileOpening => {
                info!(
                    "<{}> \"{}\" created.",
                    room_id,
                    self.resolve_recording_path(&data.relative_path).display()
                );
            }
            EventType::FileClosed => {}
            EventType::SessionEnded => {
                info!("<{}> offline.", room_id);
            }
            EventType::Unknown => {
                debug!(event_id = %event.event_id, "ignoring unhandled event type");
                return outcome;
            }
        }

        if let Some(tag) = event.event_type.room_event() {
            self.notifier.notify(room_id, tag).await;
            outcome.notified = Some(tag);
        }

        if event.event_type == EventType::FileClosed {
            let path = self.resolve_recording_path(&data.relative_path);
            info!("<{}> \"{}\" finished.", room_id, path.display());

            match self.queue.submit(TranscodeJob::new(path.clone())).await {
                Ok(()) => outcome.enqueued = Some(path),
                Err(e) => error!(room_id, path = %path.display(), "Error: {}", e),
            }
        }

        outcome
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::events::EventData;
    use crate::queue::QueueError;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    /// Notifier that records every call
    #[derive(Default)]
    pub(crate) struct CapturingNotifier {
        pub(crate) calls: Mutex<Vec<(i64, RoomEvent)>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn notify(&self, room_id: i64, event: RoomEvent) {
            self.calls.lock().await.push((room_id, event));
        }
    }

    /// Queue that accepts immediately and records admissions
    #[derive(Default)]
    pub(crate) struct CapturingQueue {
        pub(crate) jobs: Mutex<Vec<TranscodeJob>>,
    }

    #[async_trait]
    impl JobQueue for CapturingQueue {
        async fn submit(&self, job: TranscodeJob) -> Result<(), QueueError> {
            self.jobs.lock().await.push(job);
            Ok(())
        }
    }

    struct ClosedQueue;

    #[async_trait]
    impl JobQueue for ClosedQueue {
        async fn submit(&self, _job: TranscodeJob) -> Result<(), QueueError> {
            Err(QueueError::Closed)
        }
    }

    pub(crate) fn event(event_type: EventType, room_id: i64, relative_path: &str) -> RecorderEvent {
        RecorderEvent {
            event_type,
            event_id: "test-event".to_string(),
            event_data: EventData {
                room_id,
                relative_path: relative_path.to_string(),
                ..EventData::default()
            },
            ..RecorderEvent::default()
        }
    }

    fn dispatcher() -> (EventDispatcher, Arc<CapturingNotifier>, Arc<CapturingQueue>) {
        let notifier = Arc::new(CapturingNotifier::default());
        let queue = Arc::new(CapturingQueue::default());
        let dispatcher =
            EventDispatcher::new(PathBuf::from("/srv/rec"), notifier.clone(), queue.clone());
        (dispatcher, notifier, queue)
    }

    #[tokio::test]
    async fn test_notify_only_event_types() {
        let cases = [
            (EventType::SessionStarted, RoomEvent::Online),
            (EventType::FileOpening, RoomEvent::Start),
            (EventType::SessionEnded, RoomEvent::Offline),
        ];

        for (event_type, expected) in cases {
            let (dispatcher, notifier, queue) = dispatcher();

            let outcome = dispatcher.dispatch(&event(event_type, 42, "42/a.flv")).await;

            assert_eq!(outcome.notified, Some(expected));
            assert_eq!(outcome.enqueued, None);
            assert_eq!(*notifier.calls.lock().await, vec![(42, expected)]);
            assert!(queue.jobs.lock().await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_file_closed_notifies_and_enqueues() {
        let (dispatcher, notifier, queue) = dispatcher();

        let outcome = dispatcher
            .dispatch(&event(EventType::FileClosed, 7, "7-room/rec.flv"))
            .await;

        let expected = PathBuf::from("/srv/rec/7-room/rec.flv");
        assert_eq!(outcome.notified, Some(RoomEvent::Stop));
        assert_eq!(outcome.enqueued, Some(expected.clone()));
        assert_eq!(*notifier.calls.lock().await, vec![(7, RoomEvent::Stop)]);
        assert_eq!(*queue.jobs.lock().await, vec![TranscodeJob::new(expected)]);
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let (dispatcher, notifier, queue) = dispatcher();

        let outcome = dispatcher
            .dispatch(&event(EventType::Unknown, 7, "7-room/rec.flv"))
            .await;

        assert_eq!(outcome, DispatchOutcome::default());
        assert!(notifier.calls.lock().await.is_empty());
        assert!(queue.jobs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_events_are_not_rejected() {
        let (dispatcher, notifier, queue) = dispatcher();

        // File closes before the session ever started, twice
        dispatcher.dispatch(&event(EventType::FileClosed, 1, "x.flv")).await;
        dispatcher.dispatch(&event(EventType::FileClosed, 1, "x.flv")).await;
        dispatcher.dispatch(&event(EventType::SessionEnded, 1, "")).await;

        assert_eq!(notifier.calls.lock().await.len(), 3);
        assert_eq!(queue.jobs.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_closed_queue_still_notifies() {
        let notifier = Arc::new(CapturingNotifier::default());
        let dispatcher =
            EventDispatcher::new(PathBuf::from("/srv/rec"), notifier.clone(), Arc::new(ClosedQueue));

        let outcome = dispatcher
            .dispatch(&event(EventType::FileClosed, 9, "9/rec.flv"))
            .await;

        assert_eq!(outcome.notified, Some(RoomEvent::Stop));
        assert_eq!(outcome.enqueued, None);
        assert_eq!(notifier.calls.lock().await.len(), 1);
    }

    #[test]
    fn test_resolve_recording_path() {
        let (dispatcher, _, _) = dispatcher();

        assert_eq!(
            dispatcher.resolve_recording_path("a/b.flv"),
            PathBuf::from("/srv/rec/a/b.flv")
        );
        assert_eq!(
            dispatcher.resolve_recording_path("/a/b.flv"),
            PathBuf::from("/srv/rec/a/b.flv")
        );
    }
}
