//! `GET /ws/logs/:name?file=&search=`, the live-tail WebSocket endpoint.
//! Bridges `Engine::follow`'s push-based `QueueSink` to an axum WebSocket
//! by polling `QueueSink::recv` in a loop and forwarding each line as a
//! text frame until the socket closes or the follower is cancelled from
//! the other side (file deleted, server shutdown).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use std::sync::Arc;

use crate::engine::QueueSink;
use crate::web::api::AppState;

#[derive(Debug, Deserialize)]
pub struct FollowParams {
    pub file: String,
    #[serde(default)]
    pub search: String,
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<FollowParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, name, params))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, name: String, params: FollowParams) {
    let sink = Arc::new(QueueSink::with_default_capacity());

    let cancel = match state
        .engine
        .follow(&name, &params.file, params.search, sink.clone())
    {
        Ok(handle) => handle,
        Err(e) => {
            let _ = socket
                .send(Message::Text(format!("{{\"error\":\"{e}\"}}")))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    loop {
        tokio::select! {
            line = sink.recv() => {
                match line {
                    Some(line) => {
                        if socket.send(Message::Text(line)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    cancel.cancel();
}
