use crate::types::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames accepted from clients.
///
/// The `type` field selects the variant; unknown types fail to parse and are
/// reported as `PARSE_ERROR`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        room: Option<RoomName>,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: Option<String>,
    },
    Message {
        text: String,
    },
    /// Point-to-point negotiation payload, never inspected by the server
    Signal {
        to: ClientId,
        payload: Value,
    },
    Audio {
        audio_data: String,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Message { .. } => "message",
            ClientMessage::Signal { .. } => "signal",
            ClientMessage::Audio { .. } => "audio",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    JoinSuccess {
        client_id: ClientId,
        username: String,
        room: RoomName,
        is_admin: bool,
        #[serde(rename = "isVIP")]
        is_vip: bool,
        /// Other members already in the room
        users: Vec<UserInfo>,
        /// Replay of the room history, oldest first
        messages: Vec<ChatMessage>,
    },
    UserJoined {
        client_id: ClientId,
        username: String,
        is_admin: bool,
        #[serde(rename = "isVIP")]
        is_vip: bool,
    },
    UserLeft {
        client_id: ClientId,
        username: String,
    },
    Message {
        message: ChatMessage,
    },
    Signal {
        from: ClientId,
        payload: Value,
    },
    Audio {
        client_id: ClientId,
        username: String,
        audio_data: String,
    },
    System {
        message: String,
    },
    /// Private notice to a single client (filtered content, flood control)
    Warning {
        message: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sent right before a server-initiated close
    Kicked {
        message: String,
    },
    Help {
        commands: Vec<String>,
    },
    UserList {
        users: Vec<UserInfo>,
    },
    /// Pushed to a client whose VIP status changed
    UserRole {
        is_admin: bool,
        #[serde(rename = "isVIP")]
        is_vip: bool,
    },
}

impl ServerMessage {
    pub fn system(message: impl Into<String>) -> Self {
        ServerMessage::System {
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        ServerMessage::Warning {
            message: message.into(),
        }
    }
}
