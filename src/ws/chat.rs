//! Chat and audio frame handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

use super::moderation;

/// Route a chat line: commands go to moderation, everything else through
/// the content filter into history and the room.
pub async fn handle_chat_message(
    state: &Arc<AppState>,
    room: &str,
    client_id: &str,
    text: &str,
) -> Option<ServerMessage> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(command) = text.strip_prefix('/') {
        return moderation::handle_command(state, room, client_id, command).await;
    }

    if !state.filter.is_allowed(text) {
        tracing::warn!(client_id = %client_id, "Message blocked by content filter");
        return Some(ServerMessage::warning(
            "Your message contains inappropriate content and was not sent",
        ));
    }

    if !state.flood.allow(client_id).await {
        tracing::warn!(client_id = %client_id, "Message dropped by flood control");
        return Some(ServerMessage::warning(
            "You are sending messages too fast. Please slow down.",
        ));
    }

    match state.post_message(room, client_id, text).await {
        Some(msg) => {
            tracing::debug!(room = %room, message_id = %msg.id, "Message accepted");
        }
        None => {
            tracing::debug!(client_id = %client_id, "Sender no longer registered, message dropped");
        }
    }
    None
}

pub async fn handle_audio(
    state: &Arc<AppState>,
    room: &str,
    client_id: &str,
    audio_data: String,
) -> Option<ServerMessage> {
    if audio_data.len() > state.config.max_audio_bytes {
        tracing::warn!(
            client_id = %client_id,
            bytes = audio_data.len(),
            "Audio clip too large"
        );
        return Some(ServerMessage::warning("Audio clip is too large"));
    }

    if !state.flood.allow(client_id).await {
        return Some(ServerMessage::warning(
            "You are sending messages too fast. Please slow down.",
        ));
    }

    let delivered = state.broadcast_audio(room, client_id, audio_data).await;
    tracing::debug!(room = %room, delivered, "Audio relayed");
    None
}
