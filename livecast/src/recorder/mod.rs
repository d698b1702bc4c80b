//! Volatile per-session audio buffers.
//!
//! Both ingest paths write through the same [`RecordingBuffers`]; a buffer is
//! keyed by the live session id it records and lives from `start` until
//! `finalize` or `cancel`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use api::podcast::AudioFormat;
use api::response::RecordingStatus;
use storage::ObjectStorage;

use crate::metrics;
use crate::result::Result;
use crate::AppError;


struct Buffer {
    chunks: Vec<Bytes>,
    size: usize,
    format: AudioFormat,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Buffer {
    fn new(format: AudioFormat) -> Self {
        Self {
            chunks: Vec::new(),
            size: 0,
            format,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

/// Result of a successful finalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub public_url: String,
    pub signed_url: Option<String>,
    pub file_name: String,
    pub size_bytes: u64,
    pub duration_minutes: i64,
}

#[derive(Clone)]
pub struct RecordingBuffers {
    buffers: Arc<RwLock<HashMap<String, Arc<Mutex<Buffer>>>>>,
    storage: Arc<dyn ObjectStorage>,
    prefix: String,
}

impl RecordingBuffers {
    pub fn new(storage: Arc<dyn ObjectStorage>, prefix: String) -> Self {
        Self {
            buffers: Default::default(),
            storage,
            prefix,
        }
    }

    pub fn storage(&self) -> Arc<dyn ObjectStorage> {
        self.storage.clone()
    }

    /// Opens an empty buffer, replacing any stale one under the same key
    pub async fn start(&self, session: &str, format: AudioFormat) {
        let replaced = self
            .buffers
            .write()
            .await
            .insert(session.to_string(), Arc::new(Mutex::new(Buffer::new(format))));
        match replaced {
            Some(_) => warn!("Recording {} restarted, earlier chunks dropped", session),
            None => metrics::RECORDING.inc(),
        }
        info!("Recording started: {} ({})", session, format);
    }

    /// `false` when no buffer is open for `session`
    pub async fn append(&self, session: &str, chunk: Bytes) -> bool {
        let buffer = match self.buffers.read().await.get(session) {
            Some(buffer) => buffer.clone(),
            None => {
                debug!("No open recording for {}, chunk dropped", session);
                return false;
            }
        };
        let mut buffer = buffer.lock().await;
        buffer.size += chunk.len();
        buffer.chunks.push(chunk);
        true
    }

    /// Uploads everything appended so far. The buffer is gone afterwards,
    /// whatever the outcome.
    pub async fn finalize(&self, session: &str, owner: &str, title: &str) -> Result<Recording> {
        let buffer = self.buffers.write().await.remove(session);
        let buffer = match buffer {
            Some(buffer) => {
                metrics::RECORDING.dec();
                buffer
            }
            None => return Err(AppError::no_data(format!("no recording for {}", session))),
        };
        let mut buffer = buffer.lock().await;

        if buffer.size == 0 {
            return Err(AppError::no_data(format!("recording {} is empty", session)));
        }

        let duration_minutes = (buffer.started.elapsed().as_secs_f64() / 60.0).round() as i64;
        let mut data = BytesMut::with_capacity(buffer.size);
        for chunk in buffer.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }

        let file_name = storage::recording_file_name(
            &self.prefix,
            owner,
            Utc::now().timestamp_millis(),
            title,
            buffer.format.extension(),
        );

        let object = self
            .storage
            .upload(data.freeze(), buffer.format.content_type(), &file_name)
            .await
            .map_err(|e| AppError::storage(format!("upload of {} failed: {:#}", file_name, e)))?;

        info!(
            "Recording {} stored as {} ({} bytes)",
            session, object.file_name, object.size_bytes
        );
        Ok(Recording {
            public_url: object.public_url,
            signed_url: object.signed_url,
            file_name: object.file_name,
            size_bytes: object.size_bytes,
            duration_minutes,
        })
    }

    /// Discards the buffer, a missing buffer is fine
    pub async fn cancel(&self, session: &str) {
        if self.buffers.write().await.remove(session).is_some() {
            metrics::RECORDING.dec();
            info!("Recording cancelled: {}", session);
        }
    }

    pub async fn status(&self, session: &str) -> Option<RecordingStatus> {
        let buffer = self.buffers.read().await.get(session)?.clone();
        let buffer = buffer.lock().await;
        Some(RecordingStatus {
            chunks: buffer.chunks.len(),
            size_bytes: buffer.size,
            format: buffer.format,
            started_at: buffer.started_at.timestamp_millis(),
        })
    }

    pub async fn active(&self) -> usize {
        self.buffers.read().await.len()
    }

    /// Drops every open buffer, used on shutdown
    pub async fn clear(&self) {
        let mut buffers = self.buffers.write().await;
        for session in buffers.keys() {
            warn!("Recording {} discarded on shutdown", session);
            metrics::RECORDING.dec();
        }
        buffers.clear();
    }
}
