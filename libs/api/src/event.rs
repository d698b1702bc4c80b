//! Messages exchanged on the realtime relay channel.
//!
//! Every frame is a JSON text message `{"event": "...", "data": {...}}`.
//! `sessionId` always names the podcast (the relay room), `liveSessionId`
//! is the credential of its current live period.

use serde::{Deserialize, Serialize};

use crate::response::ListenerCounters;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Inbound {
    JoinSession(JoinSession),
    LeaveSession(LeaveSession),
    BroadcastAudioChunk(AudioChunk),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Outbound {
    JoinedSession(Joined),
    ListenerUpdate(ListenerUpdate),
    AudioStream(AudioStream),
    SessionStarted(SessionStarted),
    SessionEnded(SessionEnded),
    Error(ErrorEvent),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinSession {
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveSession {
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioChunk {
    pub session_id: String,
    pub live_session_id: String,
    /// base64 encoded media bytes
    pub audio_chunk: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    pub session_id: String,
    pub connection_id: String,
    #[serde(flatten)]
    pub counters: ListenerCounters,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListenerUpdate {
    pub session_id: String,
    #[serde(flatten)]
    pub counters: ListenerCounters,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioStream {
    pub session_id: String,
    pub audio_chunk: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub session_id: String,
    pub title: String,
    pub started_at: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    pub session_id: String,
    pub recorded_url: Option<String>,
    pub duration_minutes: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub kind: String,
    pub message: String,
}
