use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use api::event::Inbound;

use crate::error::AppError;
use crate::AppState;

pub fn route() -> Router<AppState> {
    Router::new().route(api::path::RELAY, get(upgrade))
}

async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let relay = state.relay;
    let (connection, mut rx) = relay.hub().connect().await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            maybe = rx.recv() => {
                let event = match maybe {
                    Some(event) => event,
                    None => break,
                };
                let text = match serde_json::to_string(event.as_ref()) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("relay event not serializable: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Inbound>(text.as_str()) {
                            Ok(event) => relay.dispatch(&connection, event).await,
                            Err(e) => {
                                relay
                                    .reject(&connection, &AppError::validation(format!("malformed event: {}", e)))
                                    .await
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("relay connection {} failed: {}", connection, e);
                        break;
                    }
                }
            }
        }
    }

    relay.disconnect(&connection).await;
}
