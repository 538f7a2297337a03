//! Recorder webhook payloads
//!
//! BililiveRecorder posts one JSON document per lifecycle transition. Decoding
//! is lenient: every field may be absent, and unknown event types are kept as
//! [`EventType::Unknown`] so newer recorder versions never break the hook.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Lifecycle transition reported by the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventType {
    /// Room went live and a recording session began
    SessionStarted,
    /// A new recording file is being written
    FileOpening,
    /// A recording file was finalized on disk
    FileClosed,
    /// Room went offline and the session ended
    SessionEnded,
    /// Any type this daemon does not act on
    #[default]
    #[serde(other)]
    Unknown,
}

/// Room-level tag relayed to the notification endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEvent {
    Online,
    Start,
    Stop,
    Offline,
}

impl RoomEvent {
    /// Wire value of the `event` form field
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomEvent::Online => "ONLINE",
            RoomEvent::Start => "START",
            RoomEvent::Stop => "STOP",
            RoomEvent::Offline => "OFFLINE",
        }
    }
}

impl std::fmt::Display for RoomEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EventType {
    /// Notification tag for this event type, if any
    pub fn room_event(&self) -> Option<RoomEvent> {
        match self {
            EventType::SessionStarted => Some(RoomEvent::Online),
            EventType::FileOpening => Some(RoomEvent::Start),
            EventType::FileClosed => Some(RoomEvent::Stop),
            EventType::SessionEnded => Some(RoomEvent::Offline),
            EventType::Unknown => None,
        }
    }
}

/// Payload shared by all event types; fields irrelevant to a type are left at defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventData {
    /// Recording path relative to the recorder work directory
    pub relative_path: String,
    pub file_size: u64,
    /// Seconds of media written to the file
    pub duration: f64,
    pub file_open_time: Option<DateTime<FixedOffset>>,
    pub file_close_time: Option<DateTime<FixedOffset>>,
    pub session_id: String,
    pub room_id: i64,
    pub short_id: i64,
    pub name: String,
    pub title: String,
    pub area_name_parent: String,
    pub area_name_child: String,
}

/// One webhook delivery from the recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct RecorderEvent {
    pub event_type: EventType,
    pub event_timestamp: Option<DateTime<FixedOffset>>,
    pub event_id: String,
    pub event_data: EventData,
}

impl RecorderEvent {
    /// Decode a request body
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
