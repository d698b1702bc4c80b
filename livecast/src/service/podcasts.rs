use anyhow::Result;
use chrono::DateTime;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use api::podcast::Status;
use api::request::{CreatePodcast, ListQuery, UpdatePodcast};
use crate::entity::podcasts::{self, Entity as Podcasts};
use crate::recorder::Recording;
use crate::service::now;

pub const DEFAULT_SORT: &str = "-createdAt";

/// Persistence of podcasts.
///
/// Lifecycle transitions are single conditional `UPDATE`s; the returned flag
/// tells whether the row was in the expected state.
pub struct PodcastsService;

impl PodcastsService {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        owner_id: &str,
        stream_key: &str,
        req: &CreatePodcast,
    ) -> Result<podcasts::Model> {
        let now = now();
        let model = podcasts::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(req.title.trim().to_string()),
            description: Set(req.description.clone()),
            transcription: Set(None),
            cover_image: Set(req.cover_image.clone()),
            date: Set(req.date.and_then(from_millis)),
            status: Set(Status::Scheduled.to_string()),
            owner_id: Set(owner_id.to_string()),
            stream_key: Set(stream_key.to_string()),
            live_session_id: Set(None),
            actual_start: Set(None),
            actual_end: Set(None),
            duration_minutes: Set(None),
            is_recording: Set(req.is_recording.unwrap_or(true)),
            audio_format: Set(req.audio_format.unwrap_or_default().to_string()),
            recorded_url: Set(None),
            recorded_signed_url: Set(None),
            recorded_file_name: Set(None),
            audio_size_bytes: Set(None),
            current_listeners: Set(0),
            peak_listeners: Set(0),
            total_listeners: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(db).await?)
    }

    pub async fn find<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<podcasts::Model>> {
        Ok(Podcasts::find_by_id(id).one(db).await?)
    }

    /// A live podcast whose live session id or stream key equals `credential`
    pub async fn find_live_by_credential<C: ConnectionTrait>(
        db: &C,
        credential: &str,
    ) -> Result<Option<podcasts::Model>> {
        Ok(Podcasts::find()
            .filter(podcasts::Column::Status.eq(Status::Live.to_string()))
            .filter(
                Condition::any()
                    .add(podcasts::Column::LiveSessionId.eq(credential))
                    .add(podcasts::Column::StreamKey.eq(credential)),
            )
            .one(db)
            .await?)
    }

    pub async fn list<C: ConnectionTrait>(
        db: &C,
        params: &ListQuery,
    ) -> Result<(Vec<podcasts::Model>, u64)> {
        let mut query = Podcasts::find();

        if let Some(status) = params.status {
            query = query.filter(podcasts::Column::Status.eq(status.to_string()));
        }

        if let Some(search) = params.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                query = query.filter(
                    Condition::any()
                        .add(podcasts::Column::Title.contains(search))
                        .add(podcasts::Column::Description.contains(search)),
                );
            }
        }

        let total = query.clone().count(db).await?;

        let (column, order) = sort_order(params.sort.as_deref());
        query = query
            .order_by(column, order)
            .order_by(podcasts::Column::Id, Order::Asc);

        let limit = params.limit.unwrap_or(0);
        if limit > 0 {
            let page = params.page.unwrap_or(1).max(1);
            query = query.offset((page - 1).saturating_mul(limit)).limit(limit);
        }

        Ok((query.all(db).await?, total))
    }

    /// Most recently started live podcast
    pub async fn live<C: ConnectionTrait>(db: &C) -> Result<Option<podcasts::Model>> {
        Ok(Podcasts::find()
            .filter(podcasts::Column::Status.eq(Status::Live.to_string()))
            .order_by_desc(podcasts::Column::ActualStart)
            .one(db)
            .await?)
    }

    /// Ended podcasts that have a stored recording, newest end first
    pub async fn recorded<C: ConnectionTrait>(
        db: &C,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<podcasts::Model>, u64)> {
        let query = Podcasts::find()
            .filter(podcasts::Column::Status.eq(Status::Ended.to_string()))
            .filter(podcasts::Column::RecordedUrl.is_not_null());

        let total = query.clone().count(db).await?;

        let mut query = query.order_by_desc(podcasts::Column::ActualEnd);
        if limit > 0 {
            query = query.offset((page.max(1) - 1).saturating_mul(limit)).limit(limit);
        }

        Ok((query.all(db).await?, total))
    }

    pub async fn with_recordings<C: ConnectionTrait>(db: &C) -> Result<Vec<podcasts::Model>> {
        Ok(Podcasts::find()
            .filter(podcasts::Column::RecordedFileName.is_not_null())
            .all(db)
            .await?)
    }

    /// SCHEDULED -> LIVE
    pub async fn transition_to_live<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        live_session_id: &str,
        at: DateTimeWithTimeZone,
    ) -> Result<bool> {
        let result = Podcasts::update_many()
            .col_expr(podcasts::Column::Status, Expr::value(Status::Live.to_string()))
            .col_expr(
                podcasts::Column::LiveSessionId,
                Expr::value(live_session_id.to_string()),
            )
            .col_expr(podcasts::Column::ActualStart, Expr::value(at))
            .col_expr(podcasts::Column::UpdatedAt, Expr::value(at))
            .filter(podcasts::Column::Id.eq(id))
            .filter(podcasts::Column::Status.eq(Status::Scheduled.to_string()))
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// LIVE -> ENDED, only for the live period identified by `live_session_id`
    pub async fn transition_to_ended<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        live_session_id: &str,
        at: DateTimeWithTimeZone,
        duration_minutes: i64,
    ) -> Result<bool> {
        let result = Podcasts::update_many()
            .col_expr(podcasts::Column::Status, Expr::value(Status::Ended.to_string()))
            .col_expr(podcasts::Column::ActualEnd, Expr::value(at))
            .col_expr(
                podcasts::Column::DurationMinutes,
                Expr::value(duration_minutes),
            )
            .col_expr(podcasts::Column::UpdatedAt, Expr::value(at))
            .filter(podcasts::Column::Id.eq(id))
            .filter(podcasts::Column::Status.eq(Status::Live.to_string()))
            .filter(podcasts::Column::LiveSessionId.eq(live_session_id))
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// SCHEDULED -> CANCELLED
    pub async fn transition_to_cancelled<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool> {
        let result = Podcasts::update_many()
            .col_expr(
                podcasts::Column::Status,
                Expr::value(Status::Cancelled.to_string()),
            )
            .col_expr(podcasts::Column::UpdatedAt, Expr::value(now()))
            .filter(podcasts::Column::Id.eq(id))
            .filter(podcasts::Column::Status.eq(Status::Scheduled.to_string()))
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn store_recording<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        recording: &Recording,
    ) -> Result<()> {
        Podcasts::update_many()
            .col_expr(
                podcasts::Column::RecordedUrl,
                Expr::value(recording.public_url.clone()),
            )
            .col_expr(
                podcasts::Column::RecordedSignedUrl,
                Expr::value(recording.signed_url.clone()),
            )
            .col_expr(
                podcasts::Column::RecordedFileName,
                Expr::value(recording.file_name.clone()),
            )
            .col_expr(
                podcasts::Column::AudioSizeBytes,
                Expr::value(recording.size_bytes as i64),
            )
            .col_expr(podcasts::Column::UpdatedAt, Expr::value(now()))
            .filter(podcasts::Column::Id.eq(id))
            .exec(db)
            .await?;

        Ok(())
    }

    pub async fn set_signed_url<C: ConnectionTrait>(db: &C, id: Uuid, url: &str) -> Result<()> {
        Podcasts::update_many()
            .col_expr(
                podcasts::Column::RecordedSignedUrl,
                Expr::value(url.to_string()),
            )
            .filter(podcasts::Column::Id.eq(id))
            .exec(db)
            .await?;

        Ok(())
    }

    /// Replaces the supplied descriptive fields unless the podcast is live
    pub async fn update_details<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        req: &UpdatePodcast,
    ) -> Result<bool> {
        let mut update = Podcasts::update_many()
            .col_expr(podcasts::Column::UpdatedAt, Expr::value(now()))
            .filter(podcasts::Column::Id.eq(id))
            .filter(podcasts::Column::Status.ne(Status::Live.to_string()));

        if let Some(title) = &req.title {
            update = update.col_expr(podcasts::Column::Title, Expr::value(title.trim().to_string()));
        }
        if let Some(description) = &req.description {
            update = update.col_expr(
                podcasts::Column::Description,
                Expr::value(description.clone()),
            );
        }
        if let Some(transcription) = &req.transcription {
            update = update.col_expr(
                podcasts::Column::Transcription,
                Expr::value(transcription.clone()),
            );
        }
        if let Some(cover_image) = &req.cover_image {
            update = update.col_expr(
                podcasts::Column::CoverImage,
                Expr::value(cover_image.clone()),
            );
        }
        if let Some(date) = req.date.and_then(from_millis) {
            update = update.col_expr(podcasts::Column::Date, Expr::value(date));
        }

        Ok(update.exec(db).await?.rows_affected == 1)
    }

    /// Deletes the podcast and its presence records unless it is live
    pub async fn delete_unless_live<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool> {
        let result = Podcasts::delete_many()
            .filter(podcasts::Column::Id.eq(id))
            .filter(podcasts::Column::Status.ne(Status::Live.to_string()))
            .exec(db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}

pub(crate) fn from_millis(ms: i64) -> Option<DateTimeWithTimeZone> {
    DateTime::from_timestamp_millis(ms).map(Into::into)
}

fn sort_order(sort: Option<&str>) -> (podcasts::Column, Order) {
    let sort = sort.unwrap_or(DEFAULT_SORT);
    let (field, order) = match sort.strip_prefix('-') {
        Some(field) => (field, Order::Desc),
        None => (sort, Order::Asc),
    };
    let column = match field {
        "title" => podcasts::Column::Title,
        "date" => podcasts::Column::Date,
        "status" => podcasts::Column::Status,
        "actualStart" => podcasts::Column::ActualStart,
        "actualEnd" => podcasts::Column::ActualEnd,
        "updatedAt" => podcasts::Column::UpdatedAt,
        _ => podcasts::Column::CreatedAt,
    };
    (column, order)
}
