use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use api::podcast::{AudioFormat, Status};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "podcasts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub transcription: Option<String>,
    pub cover_image: Option<String>,
    pub date: Option<DateTimeWithTimeZone>,
    pub status: String, // scheduled, live, ended, cancelled
    pub owner_id: String,
    #[sea_orm(unique)]
    pub stream_key: String,
    pub live_session_id: Option<String>,
    pub actual_start: Option<DateTimeWithTimeZone>,
    pub actual_end: Option<DateTimeWithTimeZone>,
    pub duration_minutes: Option<i64>,
    pub is_recording: bool,
    pub audio_format: String,
    pub recorded_url: Option<String>,
    pub recorded_signed_url: Option<String>,
    pub recorded_file_name: Option<String>,
    pub audio_size_bytes: Option<i64>,
    pub current_listeners: i64,
    pub peak_listeners: i64,
    pub total_listeners: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::podcast_listeners::Entity")]
    Listeners,
}

impl Related<super::podcast_listeners::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listeners.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Status {
        self.status.parse().unwrap_or(Status::Scheduled)
    }

    pub fn audio_format(&self) -> AudioFormat {
        self.audio_format.parse().unwrap_or_default()
    }

    pub fn counters(&self) -> api::response::ListenerCounters {
        api::response::ListenerCounters {
            current_listeners: self.current_listeners,
            peak_listeners: self.peak_listeners,
            total_listeners: self.total_listeners,
        }
    }
}
