//! Realtime relay: podcast rooms over a WebSocket event channel.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use api::event::{
    AudioChunk, AudioStream, Inbound, JoinSession, Joined, LeaveSession, ListenerUpdate, Outbound,
};
use api::podcast::Status;
use api::response::ListenerCounters;

use crate::error::AppError;
use crate::metrics;
use crate::recorder::RecordingBuffers;
use crate::result::Result;
use crate::service::listeners::ListenersService;
use crate::service::podcasts::PodcastsService;

pub mod hub;


pub use hub::Hub;

#[derive(Clone)]
pub struct Relay {
    db: DatabaseConnection,
    recorder: RecordingBuffers,
    hub: Hub,
}

impl Relay {
    pub fn new(db: DatabaseConnection, recorder: RecordingBuffers, hub: Hub) -> Self {
        Self { db, recorder, hub }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Handles one inbound event; failures are reported to the sender only
    pub async fn dispatch(&self, connection: &str, event: Inbound) {
        let result = match event {
            Inbound::JoinSession(req) => self.join_session(connection, req).await.map(|_| ()),
            Inbound::LeaveSession(req) => self.leave_session(connection, req).await,
            Inbound::BroadcastAudioChunk(chunk) => self
                .broadcast_audio_chunk(connection, chunk)
                .await
                .map(|_| ()),
        };
        if let Err(e) = result {
            debug!("relay event from {} rejected: {}", connection, e);
            self.reject(connection, &e).await;
        }
    }

    pub async fn reject(&self, connection: &str, err: &AppError) {
        self.hub
            .send(
                connection,
                Outbound::Error(api::event::ErrorEvent {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }),
            )
            .await;
    }

    pub async fn join_session(
        &self,
        connection: &str,
        req: JoinSession,
    ) -> Result<ListenerCounters> {
        let podcast_id = parse_session(&req.session_id)?;
        if PodcastsService::find(&self.db, podcast_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "session {} not found",
                req.session_id
            )));
        }

        // a connection listens to one podcast at a time
        for other in ListenersService::open_podcasts(&self.db, connection).await? {
            if other != podcast_id {
                self.leave_room(connection, other).await?;
            }
        }

        let counters =
            ListenersService::join(&self.db, podcast_id, req.user_id, connection).await?;
        self.hub.join(podcast_id, connection).await;

        self.hub
            .send(
                connection,
                Outbound::JoinedSession(Joined {
                    session_id: req.session_id.clone(),
                    connection_id: connection.to_string(),
                    counters,
                }),
            )
            .await;
        self.publish_counters(podcast_id, counters).await;
        info!(
            "listener {} joined {}, current: {}",
            connection, podcast_id, counters.current_listeners
        );
        Ok(counters)
    }

    pub async fn leave_session(&self, connection: &str, req: LeaveSession) -> Result<()> {
        let podcast_id = parse_session(&req.session_id)?;
        self.leave_room(connection, podcast_id).await
    }

    /// Relays one chunk of the browser broadcaster to the room and appends it
    /// to the recording, returns the number of listeners it was queued for
    pub async fn broadcast_audio_chunk(&self, connection: &str, chunk: AudioChunk) -> Result<usize> {
        let podcast_id = parse_session(&chunk.session_id)?;
        let podcast = PodcastsService::find(&self.db, podcast_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {} not found", chunk.session_id)))?;

        if podcast.status() != Status::Live {
            return Err(AppError::conflict("podcast is not currently live"));
        }
        if podcast.live_session_id.as_deref() != Some(chunk.live_session_id.as_str()) {
            return Err(AppError::forbidden("live session id does not match"));
        }

        let data = STANDARD
            .decode(chunk.audio_chunk.as_bytes())
            .map_err(|e| AppError::validation(format!("audio chunk is not base64: {}", e)))?;

        if !self
            .recorder
            .append(&chunk.live_session_id, Bytes::from(data))
            .await
        {
            debug!("podcast {} is not recording, chunk only relayed", podcast_id);
        }
        metrics::CHUNK.inc();

        Ok(self
            .hub
            .emit_room(
                podcast_id,
                Outbound::AudioStream(AudioStream {
                    session_id: chunk.session_id,
                    audio_chunk: chunk.audio_chunk,
                    mime_type: chunk.mime_type,
                    timestamp: Utc::now().timestamp_millis(),
                }),
                Some(connection),
            )
            .await)
    }

    /// Closes every open presence of the connection, in any podcast
    pub async fn disconnect(&self, connection: &str) {
        self.hub.disconnect(connection).await;

        let podcasts = match ListenersService::open_podcasts(&self.db, connection).await {
            Ok(podcasts) => podcasts,
            Err(e) => {
                warn!("presence lookup for {} failed: {:?}", connection, e);
                return;
            }
        };
        for podcast_id in podcasts {
            match ListenersService::leave(&self.db, podcast_id, connection).await {
                Ok(Some(counters)) => self.publish_counters(podcast_id, counters).await,
                Ok(None) => {}
                Err(e) => warn!(
                    "closing presence of {} in {} failed: {:?}",
                    connection, podcast_id, e
                ),
            }
        }
        debug!("relay connection {} closed", connection);
    }

    async fn leave_room(&self, connection: &str, podcast_id: Uuid) -> Result<()> {
        self.hub.leave(podcast_id, connection).await;
        if let Some(counters) = ListenersService::leave(&self.db, podcast_id, connection).await? {
            self.publish_counters(podcast_id, counters).await;
            info!(
                "listener {} left {}, current: {}",
                connection, podcast_id, counters.current_listeners
            );
        }
        Ok(())
    }

    async fn publish_counters(&self, podcast_id: Uuid, counters: ListenerCounters) {
        self.hub
            .emit_room(
                podcast_id,
                Outbound::ListenerUpdate(ListenerUpdate {
                    session_id: podcast_id.to_string(),
                    counters,
                }),
                None,
            )
            .await;
    }
}

fn parse_session(session_id: &str) -> Result<Uuid> {
    Uuid::parse_str(session_id)
        .map_err(|_| AppError::not_found(format!("session {} not found", session_id)))
}
