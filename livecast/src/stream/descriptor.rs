use api::podcast::Status;
use api::response::StreamConfig;

use crate::entity::podcasts;
use crate::stream::config::Endpoints;

/// Who a descriptor is rendered for. Only the broadcaster sees the
/// credentials of the live period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Public,
    Broadcaster,
}

pub fn channel_id(podcast: &podcasts::Model) -> String {
    format!("podcast_{}", podcast.id)
}

/// Connection descriptor of `podcast`, computed from its persisted state only
pub fn describe(podcast: &podcasts::Model, endpoints: &Endpoints, audience: Audience) -> StreamConfig {
    let channel_id = channel_id(podcast);
    let room_id = podcast.id.to_string();

    match podcast.status() {
        Status::Live => {
            let credential = match audience {
                Audience::Broadcaster => podcast.live_session_id.clone(),
                Audience::Public => None,
            };
            StreamConfig::Live {
                playback_url: format!(
                    "{}{}",
                    endpoints.ingest_url,
                    api::path::hls_playlist(&room_id)
                ),
                ingest_url: format!("{}/live", endpoints.ingest_url),
                relay_url: endpoints.relay_url.clone(),
                session_id: credential.clone(),
                stream_key: credential,
                channel_id,
                room_id,
            }
        }
        Status::Ended => match podcast
            .recorded_signed_url
            .clone()
            .or_else(|| podcast.recorded_url.clone())
        {
            Some(playback_url) => StreamConfig::OnDemand {
                channel_id,
                room_id,
                playback_url,
            },
            None => idle(channel_id, room_id, endpoints),
        },
        Status::Scheduled | Status::Cancelled => idle(channel_id, room_id, endpoints),
    }
}

fn idle(channel_id: String, room_id: String, endpoints: &Endpoints) -> StreamConfig {
    StreamConfig::Idle {
        channel_id,
        room_id,
        relay_url: endpoints.relay_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn endpoints() -> Endpoints {
        Endpoints {
            relay_url: "ws://cast.test/podcast".to_string(),
            ingest_url: "http://cast.test:8000".to_string(),
        }
    }

    fn podcast(status: Status) -> podcasts::Model {
        let now = Utc::now().into();
        podcasts::Model {
            id: Uuid::new_v4(),
            title: "Show".to_string(),
            description: None,
            transcription: None,
            cover_image: None,
            date: None,
            status: status.to_string(),
            owner_id: "alice".to_string(),
            stream_key: "key".to_string(),
            live_session_id: None,
            actual_start: None,
            actual_end: None,
            duration_minutes: None,
            is_recording: true,
            audio_format: "webm".to_string(),
            recorded_url: None,
            recorded_signed_url: None,
            recorded_file_name: None,
            audio_size_bytes: None,
            current_listeners: 0,
            peak_listeners: 0,
            total_listeners: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_scheduled_is_idle() {
        let p = podcast(Status::Scheduled);
        let config = describe(&p, &endpoints(), Audience::Broadcaster);
        assert_eq!(
            config,
            StreamConfig::Idle {
                channel_id: format!("podcast_{}", p.id),
                room_id: p.id.to_string(),
                relay_url: "ws://cast.test/podcast".to_string(),
            }
        );

        let p = podcast(Status::Cancelled);
        assert!(matches!(
            describe(&p, &endpoints(), Audience::Public),
            StreamConfig::Idle { .. }
        ));
    }

    #[test]
    fn test_live_credentials_by_audience() {
        let mut p = podcast(Status::Live);
        p.live_session_id = Some("K1".to_string());

        match describe(&p, &endpoints(), Audience::Broadcaster) {
            StreamConfig::Live {
                session_id,
                stream_key,
                ingest_url,
                playback_url,
                ..
            } => {
                assert_eq!(session_id.as_deref(), Some("K1"));
                assert_eq!(stream_key.as_deref(), Some("K1"));
                assert_eq!(ingest_url, "http://cast.test:8000/live");
                assert_eq!(
                    playback_url,
                    format!("http://cast.test:8000/hls/{}/index.m3u8", p.id)
                );
            }
            other => panic!("unexpected descriptor {:?}", other),
        }

        match describe(&p, &endpoints(), Audience::Public) {
            StreamConfig::Live {
                session_id,
                stream_key,
                ..
            } => {
                assert_eq!(session_id, None);
                assert_eq!(stream_key, None);
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }

    #[test]
    fn test_ended_prefers_signed_url() {
        let mut p = podcast(Status::Ended);
        assert!(matches!(
            describe(&p, &endpoints(), Audience::Public),
            StreamConfig::Idle { .. }
        ));

        p.recorded_url = Some("https://cdn.test/a.webm".to_string());
        assert_eq!(
            describe(&p, &endpoints(), Audience::Public),
            StreamConfig::OnDemand {
                channel_id: format!("podcast_{}", p.id),
                room_id: p.id.to_string(),
                playback_url: "https://cdn.test/a.webm".to_string(),
            }
        );

        p.recorded_signed_url = Some("https://cdn.test/a.webm?sig=1".to_string());
        match describe(&p, &endpoints(), Audience::Public) {
            StreamConfig::OnDemand { playback_url, .. } => {
                assert_eq!(playback_url, "https://cdn.test/a.webm?sig=1")
            }
            other => panic!("unexpected descriptor {:?}", other),
        }
    }

    #[test]
    fn test_describe_is_reproducible() {
        let mut p = podcast(Status::Live);
        p.live_session_id = Some("K9".to_string());
        assert_eq!(
            describe(&p, &endpoints(), Audience::Broadcaster),
            describe(&p.clone(), &endpoints(), Audience::Broadcaster)
        );
    }
}
