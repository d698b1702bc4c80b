use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use http::StatusCode;
use uuid::Uuid;

use api::request::{CreatePodcast, ListQuery, UpdatePodcast};
use api::response::{Page, Podcast, PodcastStatus, Started, StreamConfig};
use auth::claims::Claims;

use crate::podcast::Caller;
use crate::result::Result;
use crate::stream::descriptor::Audience;
use crate::AppState;

/// Read endpoints, open to every caller
pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::PODCASTS, get(index))
        .route(api::path::PODCASTS_LIVE, get(live))
        .route(api::path::PODCASTS_RECORDED, get(recorded))
        .route(&api::path::podcast("{id}"), get(show))
        .route(&api::path::podcast_status("{id}"), get(status))
        .route(&api::path::podcast_stream("{id}"), get(stream))
}

/// Lifecycle endpoints, require admin claims
pub fn admin_route() -> Router<AppState> {
    Router::new()
        .route(api::path::PODCASTS, post(create))
        .route(
            &api::path::podcast("{id}"),
            axum::routing::patch(update).delete(destroy),
        )
        .route(&api::path::podcast_start("{id}"), post(start))
        .route(&api::path::podcast_end("{id}"), post(end))
        .route(&api::path::podcast_cancel("{id}"), post(cancel))
}

async fn index(
    State(state): State<AppState>,
    Query(req): Query<ListQuery>,
) -> Result<Json<Page<Podcast>>> {
    Ok(Json(state.manager.list(req).await?))
}

async fn live(State(state): State<AppState>) -> Result<Json<Option<Podcast>>> {
    Ok(Json(state.manager.live().await?))
}

async fn recorded(
    State(state): State<AppState>,
    Query(req): Query<ListQuery>,
) -> Result<Json<Page<Podcast>>> {
    Ok(Json(state.manager.recorded(req).await?))
}

async fn show(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Podcast>> {
    Ok(Json(state.manager.get(id).await?))
}

async fn status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PodcastStatus>> {
    Ok(Json(state.manager.status(id).await?))
}

async fn stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StreamConfig>> {
    Ok(Json(state.manager.describe(id, Audience::Public).await?))
}

async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePodcast>,
) -> Result<(StatusCode, Json<Podcast>)> {
    let podcast = state.manager.create(&Caller::from(claims), req).await?;
    Ok((StatusCode::CREATED, Json(podcast)))
}

async fn start(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Started>> {
    Ok(Json(state.manager.start(id, &Caller::from(claims)).await?))
}

async fn end(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Podcast>> {
    Ok(Json(state.manager.end(id, &Caller::from(claims)).await?))
}

async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Podcast>> {
    Ok(Json(state.manager.cancel(id, &Caller::from(claims)).await?))
}

async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePodcast>,
) -> Result<Json<Podcast>> {
    Ok(Json(state.manager.update(id, &Caller::from(claims), req).await?))
}

async fn destroy(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Response<String>> {
    state.manager.delete(id, &Caller::from(claims)).await?;
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body("".to_string())?)
}
