use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::time;
use tracing::{debug, info, warn};

use storage::ObjectStorage;

use crate::result::Result;
use crate::service::podcasts::PodcastsService;

/// Re-signs stored recordings before their signed URLs expire
pub async fn signed_url_refresh(
    db: DatabaseConnection,
    storage: Arc<dyn ObjectStorage>,
    every: Duration,
) {
    if every.is_zero() || !storage.signs_urls() {
        info!("[signed-url] refresh disabled");
        return;
    }

    let mut interval = time::interval(every);
    // the first tick fires immediately, fresh uploads are already signed
    interval.tick().await;
    loop {
        interval.tick().await;
        match refresh_signed_urls(&db, storage.as_ref()).await {
            Ok(n) => debug!("[signed-url] refreshed {} recordings", n),
            Err(e) => warn!("[signed-url] refresh sweep failed: {}", e),
        }
    }
}

/// Returns how many recordings got a new signed URL
pub(crate) async fn refresh_signed_urls(
    db: &DatabaseConnection,
    storage: &dyn ObjectStorage,
) -> Result<usize> {
    let mut refreshed = 0;
    for podcast in PodcastsService::with_recordings(db).await? {
        let file_name = match podcast.recorded_file_name.as_deref() {
            Some(file_name) => file_name,
            None => continue,
        };
        match storage.refresh_signed_url(file_name).await {
            Ok(url) => {
                PodcastsService::set_signed_url(db, podcast.id, &url).await?;
                refreshed += 1;
            }
            Err(e) => warn!(podcast = %podcast.id, "[signed-url] {} not refreshed: {:#}", file_name, e),
        }
    }
    Ok(refreshed)
}
