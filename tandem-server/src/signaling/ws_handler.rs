use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::api::AppState;
use crate::signaling::{ConnectionContext, Flow, Outbound};

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut conn = ConnectionContext::new();
    let id = conn.id();
    info!("New WebSocket connection: {}", id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.connections.add_peer(id, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let message = match outbound {
                Outbound::Signal(signal) => match signal.to_json() {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        error!("Failed to serialize signal message: {}", e);
                        continue;
                    }
                },
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut writer_done = false;
    loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if state.relay.handle_text(&mut conn, text.as_str()).await == Flow::Close {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket error on {}: {}", id, e);
                    break;
                }
            },
            _ = &mut send_task => {
                writer_done = true;
                break;
            }
        }
    }

    state.relay.handle_close(&mut conn).await;
    state.connections.remove_peer(&id);

    // Dropping the queue lets the writer drain what is left (room-full, close).
    if !writer_done {
        let _ = send_task.await;
    }
    info!("WebSocket disconnected: {}", id);
}
