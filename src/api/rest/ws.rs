use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use futures::stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let current = state.session.snapshot().await;
    let updates = BroadcastStream::new(state.session.subscribe());

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        let mut snapshots =
            stream::iter([Ok::<_, BroadcastStreamRecvError>(current)]).chain(updates);

        while let Some(item) = snapshots.next().await {
            let snapshot = match item {
                Ok(snapshot) => snapshot,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    debug!(skipped, "websocket client lagging; snapshots dropped");
                    continue;
                }
            };

            let json = match serde_json::to_string(&snapshot) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize session snapshot for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}
