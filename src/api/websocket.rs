//! Handlers for websocket

use super::AppState;
use crate::{
    conn::{Client, Transport},
    core::{constant::PING_INTERVAL_SECS, Error},
    session::{ClientEvent, ServerEvent},
};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::{response::IntoResponse, routing::get, Router};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::{self, Duration};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket(socket, state))
}

async fn websocket(socket: WebSocket, state: Arc<AppState>) {
    // by splitting, we can send and receive at the same time
    let (mut sender, mut receiver) = socket.split();

    // create a mpsc channel for passing message
    let (tx, mut rx) = mpsc::channel(state.config.user_channel_capacity);
    let client = Client::new(tx);
    state.hub.register(&client).await;
    let clients = state.hub.num_clients().await;
    tracing::debug!(conn = client.id(), clients, "socket connected");

    // held by the operation in flight, if any
    let in_flight = Arc::new(AsyncMutex::new(()));

    // this task will receive message from mpsc channel and send to client
    let mut send_task = tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(PING_INTERVAL_SECS));
        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // this task will receive client message and process
    let mut recv_task = {
        let state = state.clone();
        let conn = client.id().to_owned();
        let in_flight = in_flight.clone();

        tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => dispatch(&state, &conn, &in_flight, event).await,
                        Err(e) => tracing::debug!(conn = %conn, "ignored frame {}: {}", text, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        })
    };

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    // an operation cut off from the read loop must land before Disconnect
    let _ = in_flight.lock().await;

    // Disconnect runs detached from the socket so it always completes
    let conn = client.id().to_owned();
    let coordinator = state.coordinator.clone();
    let cleanup = tokio::spawn(async move {
        if let Err(e) = coordinator.disconnect(&conn).await {
            tracing::error!(conn = %conn, op = "Disconnect", "operation failed: {}", e);
        }
    });
    if let Err(e) = cleanup.await {
        tracing::error!(conn = client.id(), "disconnect task failed: {}", e);
    }

    state.hub.unregister(client.id()).await;
    state.coordinator.release(client.id()).await;
    tracing::debug!(conn = client.id(), "socket disconnected");
}

/// Run one operation on its own task. Awaiting it keeps the socket's
/// operations ordered, while an abort of the read loop leaves it running.
async fn dispatch(
    state: &Arc<AppState>,
    conn: &str,
    in_flight: &Arc<AsyncMutex<()>>,
    event: ClientEvent,
) {
    let op = event.name();
    let coordinator = state.coordinator.clone();
    let task_conn = conn.to_owned();
    let permit = in_flight.clone().lock_owned().await;

    let task = tokio::spawn(async move {
        let _permit = permit;
        coordinator.handle(&task_conn, event).await
    });
    if let Err(e) = task.await {
        let err = Error::Internal(e.to_string());
        tracing::error!(conn, op, "operation task failed: {}", err);
        let reply = ServerEvent::OperationFailed(err.client_message());
        state.hub.send_to_caller(conn, &reply).await;
    }
}
