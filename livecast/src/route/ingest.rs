use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use futures_util::StreamExt;
use http::{header, HeaderMap, Method, StatusCode};
use tracing::debug;

use api::podcast::AudioFormat;

use crate::AppState;

/// Encoders push one long request body, e.g. `ffmpeg -f mp3 -method PUT
/// http://host:8000/live/{credential}` or an Icecast style `SOURCE`
pub fn route() -> Router<AppState> {
    Router::new()
        .route(&api::path::ingest("{credential}"), any(publish))
        .layer(DefaultBodyLimit::disable())
}

async fn publish(
    State(state): State<AppState>,
    Path(credential): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    if !matches!(method.as_str(), "PUT" | "POST" | "SOURCE") {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let format = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(AudioFormat::from_content_type);

    let ingest = state.ingest;
    let mut producer = match ingest.open(&credential, format).await {
        Ok(producer) => producer,
        Err(e) => return e.into_response(),
    };

    let idle = ingest.idle_timeout();
    let mut stream = body.into_data_stream();
    let reason = loop {
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(Ok(chunk))) => ingest.push(&mut producer, chunk).await,
            Ok(Some(Err(e))) => {
                debug!(podcast = %producer.podcast_id, "push body failed: {}", e);
                break "connection lost";
            }
            Ok(None) => break "finished",
            Err(_) => break "idle timeout",
        }
    };
    ingest.close(producer, reason).await;

    StatusCode::NO_CONTENT.into_response()
}
