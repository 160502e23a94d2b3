//! WebSocket message dispatch
//!
//! Each connection runs the `Unjoined -> Joined -> Closed` state machine.
//! Frames are routed here after parsing; replies meant only for the sender
//! are returned, everything else is delivered through the room.

use crate::broadcast::ClientHandle;
use crate::error::ChatError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::{ClientId, RoomName};
use std::sync::Arc;

use super::{chat, signal};

/// Per-connection lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Unjoined,
    Joined {
        room: RoomName,
        client_id: ClientId,
        username: String,
    },
    Closed,
}

impl Session {
    pub fn is_joined(&self) -> bool {
        matches!(self, Session::Joined { .. })
    }
}

/// Parse a raw text frame and dispatch it.
///
/// Malformed frames are logged and answered with `PARSE_ERROR`; the
/// connection stays up. Only the frame kind and size are logged.
pub async fn handle_text(
    text: &str,
    session: &mut Session,
    handle: &ClientHandle,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => {
            // Never the raw text: it can hold a password or a whole audio clip
            tracing::debug!(kind = msg.kind(), bytes = text.len(), "Received frame");
            handle_message(msg, session, handle, state).await
        }
        Err(e) => {
            tracing::warn!(bytes = text.len(), "Failed to parse client message: {}", e);
            Some(ServerMessage::Error {
                code: "PARSE_ERROR".to_string(),
                message: format!("Invalid message format: {}", e),
            })
        }
    }
}

/// Handle client messages and return an optional private reply
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    handle: &ClientHandle,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    if *session == Session::Unjoined {
        return handle_unjoined(msg, session, handle, state).await;
    }

    let Session::Joined {
        room, client_id, ..
    } = &*session
    else {
        tracing::debug!("Ignoring {} frame on closed session", msg.kind());
        return None;
    };
    let (room, client_id) = (room.clone(), client_id.clone());

    match msg {
        ClientMessage::Join { .. } => {
            tracing::debug!(client_id = %client_id, "Ignoring repeated join");
            None
        }

        ClientMessage::Message { text } => {
            chat::handle_chat_message(state, &room, &client_id, &text).await
        }

        ClientMessage::Signal { to, payload } => {
            signal::handle_signal(state, &room, &client_id, &to, payload).await
        }

        ClientMessage::Audio { audio_data } => {
            chat::handle_audio(state, &room, &client_id, audio_data).await
        }
    }
}

async fn handle_unjoined(
    msg: ClientMessage,
    session: &mut Session,
    handle: &ClientHandle,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    let kind = msg.kind();
    let ClientMessage::Join {
        room,
        username,
        password,
    } = msg
    else {
        tracing::debug!("Rejecting {} frame before join", kind);
        return Some(ChatError::NotJoined.into());
    };

    match state
        .join_room(room.as_deref(), &username, password.as_deref(), handle)
        .await
    {
        Ok(joined) => {
            *session = Session::Joined {
                room: joined.room,
                client_id: joined.client_id,
                username: joined.username,
            };
            None
        }
        Err(e) => {
            tracing::info!("Join rejected: {}", e);
            Some(e.into())
        }
    }
}

/// Tear down a session: deregister and announce `user-left` if still joined.
///
/// Safe to call more than once and after a moderator already removed the client.
pub async fn handle_disconnect(session: &mut Session, state: &Arc<AppState>) {
    if let Session::Joined {
        room,
        client_id,
        username,
    } = std::mem::replace(session, Session::Closed)
    {
        if state.leave_room(&room, &client_id).await.is_none() {
            tracing::debug!(
                client_id = %client_id,
                username = %username,
                "Client was already removed from the room"
            );
        }
    }
}
