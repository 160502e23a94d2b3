mod chat;
pub mod handlers;
pub mod moderation;
mod signal;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::broadcast::{ClientHandle, Outbound};
use crate::state::AppState;
use handlers::Session;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    let (handle, outbound) = ClientHandle::channel(state.config.outbound_queue);
    let mut writer = tokio::spawn(write_outbound(sender, outbound, state.config.write_timeout));

    let mut session = Session::Unjoined;

    loop {
        tokio::select! {
            // Writer ends on server-side close, write error or write timeout
            _ = &mut writer => {
                tracing::debug!("Writer finished, closing connection");
                break;
            }

            _ = handle.killed() => {
                tracing::info!("Connection killed by server");
                break;
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply =
                            handlers::handle_text(text.as_str(), &mut session, &handle, &state)
                                .await;
                        if let Some(reply) = reply {
                            handle.send(reply);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        handle.pong(data);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    handlers::handle_disconnect(&mut session, &state).await;
    writer.abort();

    tracing::info!("WebSocket connection closed");
}

/// Drain the connection's outbound queue into the socket.
///
/// Every write is bounded by `write_timeout`, so a stalled peer cannot pin
/// this task.
async fn write_outbound(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    write_timeout: Duration,
) {
    while let Some(item) = outbound.recv().await {
        let (msg, closing) = match item {
            Outbound::Frame(frame) => match serde_json::to_string(&frame) {
                Ok(json) => (Message::Text(json.into()), false),
                Err(e) => {
                    tracing::error!("Failed to serialize frame: {}", e);
                    continue;
                }
            },
            Outbound::Pong(data) => (Message::Pong(data), false),
            Outbound::Close => (Message::Close(None), true),
        };

        match tokio::time::timeout(write_timeout, sender.send(msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("WebSocket write failed: {}", e);
                break;
            }
            Err(_) => {
                tracing::warn!("WebSocket write timed out after {:?}", write_timeout);
                break;
            }
        }

        if closing {
            break;
        }
    }
}
