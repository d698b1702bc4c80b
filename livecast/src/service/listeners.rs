use anyhow::{anyhow, Result};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use api::response::ListenerCounters;

use crate::entity::podcast_listeners::{self, Entity as PodcastListeners};
use crate::entity::podcasts::{self, Entity as Podcasts};
use crate::service::now;

/// Listener presence and the counters derived from it.
///
/// Each change runs in one transaction that opens with a write, so the
/// database serializes concurrent changes of one podcast. Counters are
/// written as expressions, never read and saved back.
pub struct ListenersService;

impl ListenersService {
    /// Opens a presence for `connection_id`. An earlier open presence of the
    /// same connection in this podcast is closed first.
    pub async fn join(
        db: &DatabaseConnection,
        podcast_id: Uuid,
        user_id: Option<String>,
        connection_id: &str,
    ) -> Result<ListenerCounters> {
        let at = now();
        let txn = db.begin().await?;

        close_open(&txn, podcast_id, connection_id, at).await?;

        podcast_listeners::ActiveModel {
            podcast_id: Set(podcast_id),
            user_id: Set(user_id),
            connection_id: Set(connection_id.to_string()),
            joined_at: Set(at),
            left_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let counters = recount(&txn, podcast_id, true, at).await?;
        txn.commit().await?;
        Ok(counters)
    }

    /// Closes the open presence of `connection_id`, `None` when there was none
    pub async fn leave(
        db: &DatabaseConnection,
        podcast_id: Uuid,
        connection_id: &str,
    ) -> Result<Option<ListenerCounters>> {
        let at = now();
        let txn = db.begin().await?;

        if close_open(&txn, podcast_id, connection_id, at).await? == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let counters = recount(&txn, podcast_id, false, at).await?;
        txn.commit().await?;
        Ok(Some(counters))
    }

    /// Podcasts in which `connection_id` has an open presence
    pub async fn open_podcasts<C: ConnectionTrait>(
        db: &C,
        connection_id: &str,
    ) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = PodcastListeners::find()
            .filter(podcast_listeners::Column::ConnectionId.eq(connection_id))
            .filter(podcast_listeners::Column::LeftAt.is_null())
            .all(db)
            .await?
            .into_iter()
            .map(|presence| presence.podcast_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    pub async fn for_podcast<C: ConnectionTrait>(
        db: &C,
        podcast_id: Uuid,
    ) -> Result<Vec<podcast_listeners::Model>> {
        Ok(PodcastListeners::find()
            .filter(podcast_listeners::Column::PodcastId.eq(podcast_id))
            .order_by_asc(podcast_listeners::Column::JoinedAt)
            .order_by_asc(podcast_listeners::Column::Id)
            .all(db)
            .await?)
    }
}

async fn close_open<C: ConnectionTrait>(
    db: &C,
    podcast_id: Uuid,
    connection_id: &str,
    at: DateTimeWithTimeZone,
) -> Result<u64> {
    let result = PodcastListeners::update_many()
        .col_expr(podcast_listeners::Column::LeftAt, Expr::value(at))
        .filter(podcast_listeners::Column::PodcastId.eq(podcast_id))
        .filter(podcast_listeners::Column::ConnectionId.eq(connection_id))
        .filter(podcast_listeners::Column::LeftAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn recount<C: ConnectionTrait>(
    db: &C,
    podcast_id: Uuid,
    joined: bool,
    at: DateTimeWithTimeZone,
) -> Result<ListenerCounters> {
    let current = PodcastListeners::find()
        .filter(podcast_listeners::Column::PodcastId.eq(podcast_id))
        .filter(podcast_listeners::Column::LeftAt.is_null())
        .count(db)
        .await? as i64;

    let mut update = Podcasts::update_many()
        .col_expr(podcasts::Column::CurrentListeners, Expr::value(current))
        .col_expr(podcasts::Column::UpdatedAt, Expr::value(at))
        .filter(podcasts::Column::Id.eq(podcast_id));
    if joined {
        update = update.col_expr(
            podcasts::Column::TotalListeners,
            Expr::col(podcasts::Column::TotalListeners).add(1),
        );
    }
    update.exec(db).await?;

    Podcasts::update_many()
        .col_expr(podcasts::Column::PeakListeners, Expr::value(current))
        .filter(podcasts::Column::Id.eq(podcast_id))
        .filter(podcasts::Column::PeakListeners.lt(current))
        .exec(db)
        .await?;

    let podcast = Podcasts::find_by_id(podcast_id)
        .one(db)
        .await?
        .ok_or_else(|| anyhow!("podcast {} disappeared during recount", podcast_id))?;
    Ok(podcast.counters())
}
