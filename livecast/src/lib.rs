use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{error, info, info_span, Level};

use auth::{access::admin_middleware, ManyValidate};
use storage::{Backend, ObjectStorage, OperatorStorage};

use crate::config::Config;
use crate::ingest::Ingest;
use crate::podcast::Manager;
use crate::recorder::RecordingBuffers;
use crate::relay::{Hub, Relay};
use crate::route::AppState;
use crate::service::database::DatabaseService;
use crate::stream::config::Endpoints;

pub use error::AppError;

pub mod config;

mod convert;
mod entity;
mod error;
mod ingest;
mod metrics;
mod migration;
mod podcast;
mod recorder;
mod relay;
mod result;
mod route;
mod service;
mod stream;
mod tick;

#[cfg(test)]
mod testing;

/// Runs the API/relay listener and the push-ingest listener until `signal`
/// resolves
pub async fn serve<F>(
    cfg: Config,
    listener: TcpListener,
    ingest_listener: TcpListener,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Server listening on {}", listener.local_addr()?);
    info!("Push ingest listening on {}", ingest_listener.local_addr()?);

    let db = DatabaseService::new(&cfg.database).await?.connection;
    let storage: Arc<dyn ObjectStorage> =
        Arc::new(OperatorStorage::from_config(&cfg.storage).await?);
    let recorder = RecordingBuffers::new(storage.clone(), cfg.storage.prefix.clone());
    let hub = Hub::new(cfg.relay.outbox_capacity);
    let manager = Manager::new(
        db.clone(),
        recorder.clone(),
        hub.clone(),
        Endpoints::from_config(&cfg),
    );

    let app_state = AppState {
        config: cfg.clone(),
        manager: manager.clone(),
        relay: Relay::new(db.clone(), recorder, hub),
        ingest: Ingest::new(
            db.clone(),
            manager.clone(),
            cfg.ingest.hls.clone(),
            Duration::from_millis(cfg.ingest.idle_timeout),
        ),
    };

    let auth_layer = ValidateRequestHeaderLayer::custom(ManyValidate::new(
        cfg.auth.secret.clone(),
        cfg.auth.tokens.clone(),
    ));
    let mut app = Router::new()
        .merge(
            route::podcast::admin_route()
                .layer(middleware::from_fn(admin_middleware))
                .layer(auth_layer),
        )
        .merge(route::podcast::route())
        .merge(route::relay::route())
        .route(api::path::METRICS, get(metrics));
    if let Backend::Fs { root } = &cfg.storage.backend {
        app = app.nest_service(api::path::RECORDINGS, ServeDir::new(root));
    }
    let app = with_layers(app.with_state(app_state.clone()), &cfg);

    let mut ingest_app = route::ingest::route();
    if cfg.ingest.hls.enabled {
        ingest_app = ingest_app.nest_service(api::path::HLS, ServeDir::new(&cfg.ingest.hls.root));
    }
    let ingest_app = with_layers(ingest_app.with_state(app_state.clone()), &cfg);

    tokio::spawn(tick::signed_url_refresh(
        db,
        storage,
        Duration::from_secs(cfg.recorder.signed_url_refresh),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        signal.await;
        let _ = shutdown_tx.send(true);
    });
    let shutdown = |mut rx: watch::Receiver<bool>| async move {
        let _ = rx.wait_for(|stop| *stop).await;
    };

    let (api, ingest) = tokio::join!(
        axum::serve(listener, app).with_graceful_shutdown(shutdown(shutdown_rx.clone())),
        axum::serve(ingest_listener, ingest_app).with_graceful_shutdown(shutdown(shutdown_rx)),
    );
    if let Err(e) = api {
        error!("Application error: {e}");
    }
    if let Err(e) = ingest {
        error!("Ingest error: {e}");
    }

    manager.shutdown().await;
    Ok(())
}

fn with_layers(app: Router, cfg: &Config) -> Router {
    app.layer(if cfg.http.cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    })
    .layer(middleware::from_fn(http_log::print_request_response))
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let span = info_span!(
                    "http_request",
                    uri = ?request.uri(),
                    method = ?request.method(),
                    span_id = tracing::field::Empty,
                );
                span.record(
                    "span_id",
                    span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                );
                span
            })
            .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
            .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
    )
}

pub fn metrics_register() {
    for gauge in [
        &*metrics::LIVE,
        &*metrics::RECORDING,
        &*metrics::CONNECTION,
        &*metrics::PRODUCER,
    ] {
        if let Err(e) = metrics::REGISTRY.register(Box::new(gauge.clone())) {
            error!("metrics register failed: {}", e);
        }
    }
    for counter in [&*metrics::CHUNK, &*metrics::DROPPED] {
        if let Err(e) = metrics::REGISTRY.register(Box::new(counter.clone())) {
            error!("metrics register failed: {}", e);
        }
    }
}

async fn metrics() -> String {
    metrics::ENCODER
        .encode_to_string(&metrics::REGISTRY.gather())
        .unwrap_or_else(|e| format!("# {}", e))
}
