use api::response::{Listener, Podcast};

use crate::entity::{podcast_listeners, podcasts};
use crate::stream::config::Endpoints;
use crate::stream::descriptor::{describe, Audience};

impl From<podcast_listeners::Model> for Listener {
    fn from(value: podcast_listeners::Model) -> Self {
        Listener {
            user_id: value.user_id,
            connection_id: value.connection_id,
            joined_at: value.joined_at.timestamp_millis(),
            left_at: value.left_at.map(|t| t.timestamp_millis()),
        }
    }
}

pub fn podcast_view(
    model: podcasts::Model,
    listeners: Vec<podcast_listeners::Model>,
    endpoints: &Endpoints,
    audience: Audience,
) -> Podcast {
    let stream_config = describe(&model, endpoints, audience);
    let (live_session_id, stream_key) = match audience {
        Audience::Broadcaster => (model.live_session_id.clone(), Some(model.stream_key.clone())),
        Audience::Public => (None, None),
    };
    Podcast {
        id: model.id.to_string(),
        status: model.status(),
        audio_format: model.audio_format(),
        counters: model.counters(),
        title: model.title,
        description: model.description,
        transcription: model.transcription,
        cover_image: model.cover_image,
        date: model.date.map(|t| t.timestamp_millis()),
        owner_id: model.owner_id,
        live_session_id,
        stream_key,
        actual_start: model.actual_start.map(|t| t.timestamp_millis()),
        actual_end: model.actual_end.map(|t| t.timestamp_millis()),
        duration_minutes: model.duration_minutes,
        is_recording: model.is_recording,
        recorded_url: model.recorded_url,
        recorded_signed_url: model.recorded_signed_url,
        recorded_file_name: model.recorded_file_name,
        audio_size_bytes: model.audio_size_bytes,
        listeners: listeners.into_iter().map(Into::into).collect(),
        stream_config,
        created_at: model.created_at.timestamp_millis(),
        updated_at: model.updated_at.timestamp_millis(),
    }
}
