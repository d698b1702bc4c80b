//! Push ingest for external encoders.
//!
//! A producer is authorized by the credential in its URL alone. Closing the
//! producer of a session that is still live ends the session.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use api::podcast::{AudioFormat, Status};

use crate::config::Hls;
use crate::error::AppError;
use crate::metrics;
use crate::podcast::{Caller, Manager};
use crate::result::Result;
use crate::service::podcasts::PodcastsService;

pub mod hls;


use hls::HlsWriter;

/// One connected encoder
pub struct Producer {
    pub podcast_id: Uuid,
    pub live_session_id: String,
    recording: bool,
    hls: Option<HlsWriter>,
    chunks: u64,
    bytes: u64,
}

#[derive(Clone)]
pub struct Ingest {
    db: DatabaseConnection,
    manager: Manager,
    hls: Hls,
    idle_timeout: Duration,
    producers: Arc<Mutex<HashSet<Uuid>>>,
}

impl Ingest {
    pub fn new(db: DatabaseConnection, manager: Manager, hls: Hls, idle_timeout: Duration) -> Self {
        Self {
            db,
            manager,
            hls,
            idle_timeout,
            producers: Default::default(),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Authorizes `credential` against the live sessions. Nothing is created
    /// or changed when it is rejected. Without a recognized `format` the
    /// podcast's configured one is assumed.
    pub async fn open(&self, credential: &str, format: Option<AudioFormat>) -> Result<Producer> {
        let podcast = match PodcastsService::find_live_by_credential(&self.db, credential).await? {
            Some(podcast) => podcast,
            None => {
                warn!("push ingest rejected, no live podcast for the credential");
                return Err(AppError::UnauthorizedStream);
            }
        };
        let live_session_id = match podcast.live_session_id.clone() {
            Some(live_session_id) if podcast.status() == Status::Live => live_session_id,
            _ => return Err(AppError::UnauthorizedStream),
        };

        if !self.producers.lock().await.insert(podcast.id) {
            warn!(podcast = %podcast.id, "second push producer rejected");
            return Err(AppError::conflict("a producer is already connected"));
        }
        metrics::PRODUCER.inc();

        let format = format.unwrap_or_else(|| podcast.audio_format());
        let recorder = self.manager.recorder();
        if podcast.is_recording && recorder.status(&live_session_id).await.is_none() {
            recorder.start(&live_session_id, format).await;
        }

        let hls = if self.hls.enabled {
            match HlsWriter::spawn(&self.hls, podcast.id).await {
                Ok(writer) => Some(writer),
                Err(e) => {
                    warn!(podcast = %podcast.id, "HLS disabled for this producer: {}", e);
                    None
                }
            }
        } else {
            None
        };

        info!(podcast = %podcast.id, "push producer connected ({})", format);
        Ok(Producer {
            podcast_id: podcast.id,
            live_session_id,
            recording: podcast.is_recording,
            hls,
            chunks: 0,
            bytes: 0,
        })
    }

    pub async fn push(&self, producer: &mut Producer, chunk: Bytes) {
        producer.chunks += 1;
        producer.bytes += chunk.len() as u64;

        if let Some(hls) = producer.hls.as_mut() {
            hls.write(&chunk).await;
        }
        if producer.recording
            && !self
                .manager
                .recorder()
                .append(&producer.live_session_id, chunk)
                .await
        {
            debug!(podcast = %producer.podcast_id, "chunk after the recording closed");
        }
    }

    /// Releases the producer and ends the session if it is still in the
    /// live period the producer was opened for
    pub async fn close(&self, mut producer: Producer, reason: &str) {
        if let Some(hls) = producer.hls.take() {
            hls.finish().await;
        }
        if self.producers.lock().await.remove(&producer.podcast_id) {
            metrics::PRODUCER.dec();
        }
        info!(
            podcast = %producer.podcast_id,
            "push producer closed ({}), {} chunks, {} bytes",
            reason, producer.chunks, producer.bytes
        );

        let still_live = match PodcastsService::find(&self.db, producer.podcast_id).await {
            Ok(Some(podcast)) => {
                podcast.status() == Status::Live
                    && podcast.live_session_id.as_deref() == Some(producer.live_session_id.as_str())
            }
            Ok(None) => false,
            Err(e) => {
                warn!(podcast = %producer.podcast_id, "lookup after producer close failed: {:?}", e);
                false
            }
        };
        if !still_live {
            // open may have started a buffer after the session was ended
            self.manager.recorder().cancel(&producer.live_session_id).await;
            return;
        }

        match self.manager.end(producer.podcast_id, &Caller::Implicit).await {
            Ok(_) => info!(podcast = %producer.podcast_id, "podcast ended by producer disconnect"),
            // an explicit end may have won the race
            Err(AppError::Conflict(_)) => {}
            Err(e) => warn!(podcast = %producer.podcast_id, "implicit end failed: {}", e),
        }
    }
}
