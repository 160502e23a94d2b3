use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type ClientId = String;
pub type MessageId = String;
pub type RoomName = String;

/// Role flags of a connected client.
///
/// `is_admin` is fixed at join time; `is_vip` follows the global VIP set and
/// may change mid-session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleFlags {
    pub is_admin: bool,
    #[serde(rename = "isVIP")]
    pub is_vip: bool,
}

impl RoleFlags {
    pub fn tier(&self) -> Tier {
        if self.is_admin {
            Tier::Admin
        } else if self.is_vip {
            Tier::Vip
        } else {
            Tier::Guest
        }
    }
}

/// Moderation tier derived from the role flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Guest,
    Vip,
    Admin,
}

/// A chat message as stored in room history.
///
/// Badges are captured when the message is accepted and never re-derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub username: String,
    pub text: String,
    /// RFC 3339 / ISO-8601
    pub timestamp: String,
    pub is_admin: bool,
    #[serde(rename = "isVIP")]
    pub is_vip: bool,
}

/// Public member info sent in `join-success` and `user-list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: ClientId,
    pub username: String,
    pub is_admin: bool,
    #[serde(rename = "isVIP")]
    pub is_vip: bool,
}

/// Truncate to at most `max` characters (not bytes)
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
