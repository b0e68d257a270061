//! `WebSocket` tick stream.
//!
//! `GET /ws/ticks` upgrades to a socket that first receives a `hello`
//! frame naming the local agent and the last broadcast tick, then one
//! JSON [`TickBroadcast`] per completed tick. A client that lags behind the
//! feed jumps to the newest tick instead of replaying the backlog.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, TickBroadcast};

/// First frame sent on every connection.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Greeting {
    Hello { agent_id: String, last_tick: u64 },
}

/// Whether the socket loop keeps going after a frame.
enum Flow {
    Continue,
    Close,
}

/// Upgrade to a `WebSocket` and stream tick summaries.
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_ticks(socket, state))
}

async fn stream_ticks(mut socket: WebSocket, state: Arc<AppState>) {
    let mut ticks = state.subscribe();
    let hello = Greeting::Hello {
        agent_id: state.world.self_id().to_string(),
        last_tick: state.last_tick(),
    };
    if matches!(send_json(&mut socket, &hello).await, Flow::Close) {
        return;
    }
    debug!("Tick stream client connected");

    loop {
        let flow = tokio::select! {
            received = ticks.recv() => on_tick(&mut socket, received).await,
            frame = socket.recv() => on_client_frame(&mut socket, frame).await,
        };
        if matches!(flow, Flow::Close) {
            debug!("Tick stream client gone");
            return;
        }
    }
}

async fn on_tick(socket: &mut WebSocket, received: Result<TickBroadcast, RecvError>) -> Flow {
    match received {
        Ok(tick) => send_json(socket, &tick).await,
        Err(RecvError::Lagged(skipped)) => {
            debug!(skipped, "Tick stream client lagged");
            Flow::Continue
        }
        Err(RecvError::Closed) => Flow::Close,
    }
}

async fn on_client_frame(
    socket: &mut WebSocket,
    frame: Option<Result<Message, axum::Error>>,
) -> Flow {
    match frame {
        Some(Ok(Message::Ping(payload))) => {
            if socket.send(Message::Pong(payload)).await.is_err() {
                return Flow::Close;
            }
            Flow::Continue
        }
        // Clients have nothing to say on this socket.
        Some(Ok(Message::Text(_) | Message::Binary(_) | Message::Pong(_))) => Flow::Continue,
        Some(Ok(Message::Close(_))) | None => Flow::Close,
        Some(Err(e)) => {
            debug!(error = %e, "Tick stream socket error");
            Flow::Close
        }
    }
}

async fn send_json<T: Serialize + Sync>(socket: &mut WebSocket, value: &T) -> Flow {
    let text = match serde_json::to_string(value) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to encode tick stream frame");
            return Flow::Continue;
        }
    };
    if socket.send(Message::Text(text.into())).await.is_err() {
        return Flow::Close;
    }
    Flow::Continue
}
