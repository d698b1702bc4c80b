use serde::{Deserialize, Serialize};

use crate::podcast::{AudioFormat, Status};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Podcast {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub transcription: Option<String>,
    pub cover_image: Option<String>,
    pub date: Option<i64>,
    pub status: Status,
    pub owner_id: String,
    /// Only present for callers allowed to broadcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_key: Option<String>,
    pub actual_start: Option<i64>,
    pub actual_end: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub is_recording: bool,
    pub audio_format: AudioFormat,
    pub recorded_url: Option<String>,
    pub recorded_signed_url: Option<String>,
    pub recorded_file_name: Option<String>,
    pub audio_size_bytes: Option<i64>,
    #[serde(flatten)]
    pub counters: ListenerCounters,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    pub stream_config: StreamConfig,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListenerCounters {
    pub current_listeners: i64,
    pub peak_listeners: i64,
    pub total_listeners: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub user_id: Option<String>,
    pub connection_id: String,
    pub joined_at: i64,
    pub left_at: Option<i64>,
}

/// Connection descriptor of a podcast, derived from its persisted state
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum StreamConfig {
    #[serde(rename_all = "camelCase")]
    Idle {
        channel_id: String,
        room_id: String,
        relay_url: String,
    },
    #[serde(rename_all = "camelCase")]
    Live {
        channel_id: String,
        room_id: String,
        relay_url: String,
        /// Pull playback served by the push-ingest listener
        playback_url: String,
        ingest_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stream_key: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    OnDemand {
        channel_id: String,
        room_id: String,
        playback_url: String,
    },
}

impl StreamConfig {
    pub fn room_id(&self) -> &str {
        match self {
            StreamConfig::Idle { room_id, .. }
            | StreamConfig::Live { room_id, .. }
            | StreamConfig::OnDemand { room_id, .. } => room_id,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Started {
    pub podcast: Podcast,
    pub stream_config: StreamConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub chunks: usize,
    pub size_bytes: usize,
    pub format: AudioFormat,
    pub started_at: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodcastStatus {
    pub id: String,
    pub status: Status,
    pub is_live: bool,
    pub uptime_seconds: Option<i64>,
    #[serde(flatten)]
    pub counters: ListenerCounters,
    pub recording: Option<RecordingStatus>,
    pub recorded_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub error: String,
    pub message: String,
}
