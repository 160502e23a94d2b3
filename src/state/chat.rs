use super::{AppState, Client};
use crate::protocol::ServerMessage;
use crate::types::*;
use chrono::SecondsFormat;
use serde_json::Value;

impl AppState {
    /// Append a chat message to the room history and deliver it to every
    /// member, sender included.
    ///
    /// Badges are copied from the sender's current roles. Returns None if
    /// the sender is no longer registered.
    pub async fn post_message(
        &self,
        room_name: &str,
        client_id: &str,
        text: &str,
    ) -> Option<ChatMessage> {
        let room = self.room(room_name).await?;
        let mut room = room.lock().await;
        let sender = room.get(client_id)?;

        let message = ChatMessage {
            id: ulid::Ulid::new().to_string(),
            username: sender.username.clone(),
            text: truncate_chars(text, self.config.max_message_chars),
            timestamp: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            is_admin: sender.roles.is_admin,
            is_vip: sender.roles.is_vip,
        };

        room.history.push(message.clone());
        room.broadcast(
            &ServerMessage::Message {
                message: message.clone(),
            },
            None,
        );
        Some(message)
    }

    /// System notice to the whole room; not stored in history
    pub async fn broadcast_system(&self, room_name: &str, text: impl Into<String>) -> usize {
        let Some(room) = self.room(room_name).await else {
            return 0;
        };
        let room = room.lock().await;
        room.broadcast(&ServerMessage::system(text), None)
    }

    /// Forward an audio clip to everyone else in the room
    pub async fn broadcast_audio(
        &self,
        room_name: &str,
        client_id: &str,
        audio_data: String,
    ) -> usize {
        let Some(room) = self.room(room_name).await else {
            return 0;
        };
        let room = room.lock().await;
        let Some(sender) = room.get(client_id) else {
            return 0;
        };
        let msg = ServerMessage::Audio {
            client_id: sender.id.clone(),
            username: sender.username.clone(),
            audio_data,
        };
        room.broadcast(&msg, Some(client_id))
    }

    /// Deliver an opaque signaling payload to one client in the same room.
    ///
    /// Returns false when the target is unknown or its connection is gone.
    pub async fn relay_signal(
        &self,
        room_name: &str,
        from: &str,
        to: &str,
        payload: Value,
    ) -> bool {
        let Some(room) = self.room(room_name).await else {
            return false;
        };
        let room = room.lock().await;
        let Some(target) = room.get(to) else {
            return false;
        };
        if !target.handle.is_open() {
            return false;
        }
        target.handle.send(ServerMessage::Signal {
            from: from.to_string(),
            payload,
        })
    }

    /// Remove every client named `username` from the room: each gets a
    /// `kicked` notice and is closed, the rest of the room sees `user-left`.
    ///
    /// All matches are deregistered before anything is announced, so a kicked
    /// client never hears about another kicked client.
    pub async fn kick_by_name(&self, room_name: &str, username: &str, notice: &str) -> Vec<Client> {
        let mut rooms = self.rooms.write().await;
        let Some(room_arc) = rooms.get(room_name).cloned() else {
            return Vec::new();
        };
        let mut room = room_arc.lock().await;

        let ids: Vec<ClientId> = room
            .find_by_name(username)
            .into_iter()
            .map(|c| c.id.clone())
            .collect();
        let removed: Vec<Client> = ids.iter().filter_map(|id| room.remove(id)).collect();

        for client in &removed {
            client.handle.send(ServerMessage::Kicked {
                message: notice.to_string(),
            });
            client.handle.close();
            tracing::info!(
                room = %room_name,
                client_id = %client.id,
                "Client removed by moderator"
            );
        }

        for client in &removed {
            room.broadcast(
                &ServerMessage::UserLeft {
                    client_id: client.id.clone(),
                    username: client.username.clone(),
                },
                None,
            );
        }

        if room.is_empty() {
            rooms.remove(room_name);
            tracing::info!(room = %room_name, "Evicted empty room");
        }
        drop(room);
        drop(rooms);

        for client in &removed {
            self.flood.forget(&client.id).await;
        }
        removed
    }
}
