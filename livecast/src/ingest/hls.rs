use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Hls;

/// Segments one pushed stream into an HLS playlist with an ffmpeg child
/// reading the raw media from stdin.
pub struct HlsWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    monitor: JoinHandle<()>,
    playlist: PathBuf,
}

impl HlsWriter {
    pub async fn spawn(cfg: &Hls, podcast_id: Uuid) -> Result<Self> {
        let dir = cfg.root.join(podcast_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow!("Failed to create {}: {}", dir.display(), e))?;
        let playlist = dir.join("index.m3u8");

        let mut child = Command::new(&cfg.ffmpeg)
            .args([
                "-hide_banner",
                "-loglevel",
                "warning",
                "-i",
                "pipe:0",
                "-vn",
                "-c:a",
                "aac",
                "-f",
                "hls",
                "-hls_time",
                &cfg.segment_seconds.to_string(),
                "-hls_list_size",
                &cfg.list_size.to_string(),
                "-hls_flags",
                "delete_segments",
            ])
            .arg(&playlist)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow!("Failed to start ffmpeg: {}", e))?;

        info!(
            "ffmpeg segmenting {} (PID: {})",
            podcast_id,
            child.id().unwrap_or(0)
        );

        let stdin = child.stdin.take();
        let monitor = match child.stderr.take() {
            Some(stderr) => {
                let mut lines = BufReader::new(stderr).lines();
                tokio::spawn(async move {
                    while let Ok(Some(line)) = lines.next_line().await {
                        if line.is_empty() {
                            continue;
                        }
                        if line.contains("error") || line.contains("Error") {
                            error!("FFmpeg [{}]: {}", podcast_id, line);
                        } else {
                            warn!("FFmpeg [{}]: {}", podcast_id, line);
                        }
                    }
                })
            }
            None => tokio::spawn(async {}),
        };

        Ok(Self {
            child,
            stdin,
            monitor,
            playlist,
        })
    }

    /// A failed write detaches the segmenter; recording continues without it
    pub async fn write(&mut self, chunk: &[u8]) -> bool {
        let stdin = match self.stdin.as_mut() {
            Some(stdin) => stdin,
            None => return false,
        };
        if let Err(e) = stdin.write_all(chunk).await {
            warn!("ffmpeg for {} stopped accepting media: {}", self.playlist.display(), e);
            self.stdin = None;
            return false;
        }
        true
    }

    /// Closes stdin and gives ffmpeg a moment to flush the last segment
    pub async fn finish(mut self) {
        drop(self.stdin.take());
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("ffmpeg for {} exited: {}", self.playlist.display(), status),
            Ok(Err(e)) => warn!("ffmpeg wait failed: {}", e),
            Err(_) => {
                warn!("ffmpeg for {} did not exit, killing", self.playlist.display());
                let _ = self.child.kill().await;
                let _ = self.child.wait().await;
            }
        }
        self.monitor.abort();
    }
}
