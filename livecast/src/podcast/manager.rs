use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::DatabaseConnection;
use tracing::{error, info, warn};
use uuid::Uuid;

use api::event::{Outbound, SessionEnded, SessionStarted};
use api::podcast::Status;
use api::request::{CreatePodcast, ListQuery, UpdatePodcast};
use api::response::{Page, Podcast, PodcastStatus, Started, StreamConfig};

use crate::convert::podcast_view;
use crate::entity::podcasts;
use crate::error::AppError;
use crate::metrics;
use crate::podcast::{credential, Caller};
use crate::recorder::RecordingBuffers;
use crate::relay::Hub;
use crate::result::Result;
use crate::service::listeners::ListenersService;
use crate::service::now;
use crate::service::podcasts::{from_millis, PodcastsService};
use crate::stream::config::Endpoints;
use crate::stream::descriptor::{describe, Audience};

/// Owns the podcast lifecycle:
///
/// ```text
/// SCHEDULED --start--> LIVE --end--> ENDED
///     \--cancel--> CANCELLED
/// ```
///
/// Transitions are conditional updates in the database, so a failed check
/// never leaves a partial change behind.
#[derive(Clone)]
pub struct Manager {
    db: DatabaseConnection,
    recorder: RecordingBuffers,
    hub: Hub,
    endpoints: Endpoints,
}

impl Manager {
    pub fn new(
        db: DatabaseConnection,
        recorder: RecordingBuffers,
        hub: Hub,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            db,
            recorder,
            hub,
            endpoints,
        }
    }

    pub fn recorder(&self) -> &RecordingBuffers {
        &self.recorder
    }

    pub async fn create(&self, caller: &Caller, req: CreatePodcast) -> Result<Podcast> {
        let owner_id = match caller {
            Caller::Account { id, role } if role.is_admin() => id.clone(),
            _ => return Err(AppError::forbidden("only admins can create podcasts")),
        };
        req.validate().map_err(AppError::validation)?;
        check_date(req.date)?;

        let model =
            PodcastsService::create(&self.db, &owner_id, &credential::stream_key(), &req).await?;
        info!(podcast = %model.id, "podcast \"{}\" created by {}", model.title, caller);
        self.view(model, Audience::Broadcaster).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Podcast> {
        let model = self.find(id).await?;
        self.view(model, Audience::Public).await
    }

    /// List entries carry no presence records
    pub async fn list(&self, params: ListQuery) -> Result<Page<Podcast>> {
        check_paging(params.page, params.limit)?;
        let (models, total) = PodcastsService::list(&self.db, &params).await?;
        Ok(self.page(models, total, params.page, params.limit))
    }

    pub async fn live(&self) -> Result<Option<Podcast>> {
        match PodcastsService::live(&self.db).await? {
            Some(model) => Ok(Some(self.view(model, Audience::Public).await?)),
            None => Ok(None),
        }
    }

    pub async fn recorded(&self, params: ListQuery) -> Result<Page<Podcast>> {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(0);
        check_paging(Some(page), Some(limit))?;
        let (models, total) = PodcastsService::recorded(&self.db, page, limit).await?;
        Ok(self.page(models, total, Some(page), Some(limit)))
    }

    pub async fn start(&self, id: Uuid, caller: &Caller) -> Result<Started> {
        let podcast = self.find(id).await?;
        authorize(caller, &podcast)?;
        if podcast.status() != Status::Scheduled {
            return Err(start_conflict(podcast.status()));
        }

        let live_session_id = credential::live_session_id();
        // chunks may arrive as soon as the transition is visible
        if podcast.is_recording {
            self.recorder
                .start(&live_session_id, podcast.audio_format())
                .await;
        }

        let started_at = now();
        if !PodcastsService::transition_to_live(&self.db, id, &live_session_id, started_at).await? {
            if podcast.is_recording {
                self.recorder.cancel(&live_session_id).await;
            }
            let current = self.find(id).await?;
            return Err(start_conflict(current.status()));
        }
        metrics::LIVE.inc();
        info!(podcast = %id, "podcast started by {}", caller);

        self.hub
            .emit_all(Outbound::SessionStarted(SessionStarted {
                session_id: id.to_string(),
                title: podcast.title.clone(),
                started_at: started_at.timestamp_millis(),
            }))
            .await;

        let podcast = self.view(self.find(id).await?, Audience::Broadcaster).await?;
        Ok(Started {
            stream_config: podcast.stream_config.clone(),
            podcast,
        })
    }

    /// Ends the live period. The terminal state is stored before the upload
    /// is attempted; a failed upload only leaves the recording fields empty.
    pub async fn end(&self, id: Uuid, caller: &Caller) -> Result<Podcast> {
        let podcast = self.find(id).await?;
        authorize(caller, &podcast)?;
        let live_session_id = match (podcast.status(), podcast.live_session_id.clone()) {
            (Status::Live, Some(live_session_id)) => live_session_id,
            _ => return Err(AppError::conflict("podcast is not currently live")),
        };

        let ended_at = now();
        let duration = duration_minutes(podcast.actual_start, ended_at);
        if !PodcastsService::transition_to_ended(
            &self.db,
            id,
            &live_session_id,
            ended_at,
            duration,
        )
        .await?
        {
            return Err(AppError::conflict("podcast is not currently live"));
        }
        metrics::LIVE.dec();
        info!(podcast = %id, duration, "podcast ended by {}", caller);

        let recorded_url = if podcast.is_recording {
            match self
                .recorder
                .finalize(&live_session_id, &id.to_string(), &podcast.title)
                .await
            {
                Ok(recording) => {
                    if let Err(e) =
                        PodcastsService::store_recording(&self.db, id, &recording).await
                    {
                        error!(podcast = %id, "recording {} uploaded but not saved: {:?}", recording.file_name, e);
                    }
                    Some(recording.signed_url.unwrap_or(recording.public_url))
                }
                Err(e) => {
                    warn!(podcast = %id, "recording not stored: {}", e);
                    None
                }
            }
        } else {
            self.recorder.cancel(&live_session_id).await;
            None
        };

        self.hub
            .emit_room(
                id,
                Outbound::SessionEnded(SessionEnded {
                    session_id: id.to_string(),
                    recorded_url,
                    duration_minutes: Some(duration),
                }),
                None,
            )
            .await;

        self.view(self.find(id).await?, Audience::Broadcaster).await
    }

    pub async fn cancel(&self, id: Uuid, caller: &Caller) -> Result<Podcast> {
        let podcast = self.find(id).await?;
        authorize(caller, &podcast)?;
        if podcast.status() != Status::Scheduled
            || !PodcastsService::transition_to_cancelled(&self.db, id).await?
        {
            return Err(AppError::conflict("only scheduled podcasts can be cancelled"));
        }
        info!(podcast = %id, "podcast cancelled by {}", caller);
        self.view(self.find(id).await?, Audience::Broadcaster).await
    }

    pub async fn update(&self, id: Uuid, caller: &Caller, req: UpdatePodcast) -> Result<Podcast> {
        let podcast = self.find(id).await?;
        authorize(caller, &podcast)?;
        if podcast.status() == Status::Live {
            return Err(AppError::conflict("cannot update a live podcast"));
        }
        req.validate().map_err(AppError::validation)?;
        check_date(req.date)?;

        if !req.is_empty() && !PodcastsService::update_details(&self.db, id, &req).await? {
            return Err(AppError::conflict("cannot update a live podcast"));
        }
        self.view(self.find(id).await?, Audience::Broadcaster).await
    }

    pub async fn delete(&self, id: Uuid, caller: &Caller) -> Result<()> {
        let podcast = self.find(id).await?;
        authorize(caller, &podcast)?;
        if podcast.status() == Status::Live
            || !PodcastsService::delete_unless_live(&self.db, id).await?
        {
            return Err(AppError::conflict("cannot delete a live podcast"));
        }
        info!(podcast = %id, "podcast deleted by {}", caller);

        if let Some(file_name) = podcast.recorded_file_name {
            if let Err(e) = self.recorder.storage().delete(&file_name).await {
                warn!(podcast = %id, "recording {} not deleted: {:?}", file_name, e);
            }
        }
        Ok(())
    }

    pub async fn status(&self, id: Uuid) -> Result<PodcastStatus> {
        let podcast = self.find(id).await?;
        let is_live = podcast.status() == Status::Live;

        let recording = match (&podcast.live_session_id, is_live) {
            (Some(live_session_id), true) => self.recorder.status(live_session_id).await,
            _ => None,
        };
        let uptime_seconds = match (podcast.actual_start, is_live) {
            (Some(start), true) => Some((Utc::now().fixed_offset() - start).num_seconds().max(0)),
            _ => None,
        };

        Ok(PodcastStatus {
            id: podcast.id.to_string(),
            status: podcast.status(),
            is_live,
            uptime_seconds,
            counters: podcast.counters(),
            recording,
            recorded_url: podcast.recorded_signed_url.or(podcast.recorded_url),
        })
    }

    /// Drops volatile state before the process exits
    pub async fn shutdown(&self) {
        let open = self.recorder.active().await;
        if open > 0 {
            warn!("{} open recordings are lost on shutdown", open);
        }
        self.recorder.clear().await;
    }

    async fn find(&self, id: Uuid) -> Result<podcasts::Model> {
        PodcastsService::find(&self.db, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("podcast {} not found", id)))
    }

    async fn view(&self, model: podcasts::Model, audience: Audience) -> Result<Podcast> {
        let listeners = ListenersService::for_podcast(&self.db, model.id).await?;
        Ok(podcast_view(model, listeners, &self.endpoints, audience))
    }

    fn page(
        &self,
        models: Vec<podcasts::Model>,
        total: u64,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> Page<Podcast> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(0);
        Page {
            items: models
                .into_iter()
                .map(|model| podcast_view(model, vec![], &self.endpoints, Audience::Public))
                .collect(),
            total,
            page,
            limit,
            total_pages: match limit {
                0 => u64::from(total > 0),
                limit => total.div_ceil(limit),
            },
        }
    }

    /// Stream descriptor of the podcast in its current state
    pub async fn describe(&self, id: Uuid, audience: Audience) -> Result<StreamConfig> {
        Ok(describe(&self.find(id).await?, &self.endpoints, audience))
    }
}

fn authorize(caller: &Caller, podcast: &podcasts::Model) -> Result<()> {
    if caller.may_manage(&podcast.owner_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("not authorized to manage this podcast"))
    }
}

fn start_conflict(status: Status) -> AppError {
    match status {
        Status::Live => AppError::conflict("podcast is already live"),
        Status::Ended => AppError::conflict("cannot restart an ended podcast"),
        Status::Cancelled => AppError::conflict("cannot start a cancelled podcast"),
        Status::Scheduled => AppError::conflict("podcast changed state, retry"),
    }
}

/// Offset and limit must fit the signed 64-bit range of the database
fn check_paging(page: Option<u64>, limit: Option<u64>) -> Result<()> {
    let limit = limit.unwrap_or(0);
    if limit > i64::MAX as u64 {
        return Err(AppError::validation(format!("limit too large: {}", limit)));
    }
    let page = page.unwrap_or(1).max(1);
    match (page - 1).checked_mul(limit) {
        Some(offset) if offset <= i64::MAX as u64 => Ok(()),
        _ => Err(AppError::validation(format!("page out of range: {}", page))),
    }
}

fn check_date(date: Option<i64>) -> Result<()> {
    match date {
        Some(ms) if from_millis(ms).is_none() => {
            Err(AppError::validation(format!("invalid date: {}", ms)))
        }
        _ => Ok(()),
    }
}

/// Whole minutes between start and end, rounded half up
pub(crate) fn duration_minutes(
    start: Option<DateTimeWithTimeZone>,
    end: DateTimeWithTimeZone,
) -> i64 {
    match start {
        Some(start) => {
            let ms = (end - start).num_milliseconds().max(0);
            (ms as f64 / 60_000.0).round() as i64
        }
        None => 0,
    }
}
