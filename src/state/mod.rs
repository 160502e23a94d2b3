mod chat;
mod client;
mod roles;
mod room;

pub use client::Joined;
pub use roles::RoleState;
pub use room::{Client, History, Room};

use crate::abuse::{ContentFilter, FloodConfig};
use crate::auth::AdminConfig;
use crate::config::ChatConfig;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared application state.
///
/// Lock order is always `rooms` before any single room's mutex. The room
/// mutex serializes registry changes, history appends and fan-out for
/// that room.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomName, Arc<Mutex<Room>>>>>,
    /// VIP and ban sets, global to the process
    pub roles: Arc<RwLock<RoleState>>,
    pub admins: Arc<AdminConfig>,
    pub filter: Arc<ContentFilter>,
    pub flood: FloodConfig,
    pub config: Arc<ChatConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::new_with_config(
            ChatConfig::default(),
            AdminConfig::default(),
            ContentFilter::default(),
            FloodConfig::default(),
        )
    }

    pub fn new_with_config(
        config: ChatConfig,
        admins: AdminConfig,
        filter: ContentFilter,
        flood: FloodConfig,
    ) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            roles: Arc::new(RwLock::new(RoleState::default())),
            admins: Arc::new(admins),
            filter: Arc::new(filter),
            flood,
            config: Arc::new(config),
        }
    }

    pub fn with_admins(mut self, admins: AdminConfig) -> Self {
        self.admins = Arc::new(admins);
        self
    }

    pub fn with_flood(mut self, flood: FloodConfig) -> Self {
        self.flood = flood;
        self
    }

    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Look up a room without creating it
    pub(crate) async fn room(&self, name: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(name).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Joined clients across all rooms
    pub async fn online_users(&self) -> usize {
        let rooms: Vec<_> = self.rooms.read().await.values().cloned().collect();
        let mut total = 0;
        for room in rooms {
            total += room.lock().await.len();
        }
        total
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ClientHandle;

    #[tokio::test]
    async fn test_new_state_is_empty() {
        let state = AppState::new();
        assert_eq!(state.room_count().await, 0);
        assert_eq!(state.online_users().await, 0);
        assert_eq!(state.config.history_capacity, 50);
    }

    #[tokio::test]
    async fn test_online_users_counts_all_rooms() {
        let state = AppState::new();
        let (a, _rx_a) = ClientHandle::channel(8);
        let (b, _rx_b) = ClientHandle::channel(8);
        let (c, _rx_c) = ClientHandle::channel(8);

        state.join_room(Some("one"), "alice", None, &a).await.unwrap();
        state.join_room(Some("one"), "bob", None, &b).await.unwrap();
        state.join_room(Some("two"), "carol", None, &c).await.unwrap();

        assert_eq!(state.room_count().await, 2);
        assert_eq!(state.online_users().await, 3);
    }
}
