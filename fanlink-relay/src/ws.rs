use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::{Subscription, SubscriberHub};

/// Shared state for the subscriber endpoint.
#[derive(Clone)]
pub struct WsState {
    pub hub: SubscriberHub,
    pub cancel: CancellationToken,
}

/// Every path except `/health` upgrades to a subscriber connection.
pub fn router(state: WsState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(ws_handler)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let WsState { hub, cancel } = state;
    let Subscription { id, mut receiver } = hub.accept().await;
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = receiver.recv().await {
            if let Err(e) = sink.send(Message::Text(payload)).await {
                debug!(error = %e, "websocket send failed");
                break;
            }
        }
    });

    hub.mark_open(id).await;
    info!(subscriber = %id, "subscriber connected");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = &mut writer => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                // inbound data frames carry no commands
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(subscriber = %id, error = %e, "websocket error");
                    break;
                }
            },
        }
    }

    hub.mark_closing(id).await;
    writer.abort();
    hub.remove(id).await;

    info!(subscriber = %id, "subscriber disconnected");
}
