use super::{AppState, Client, Room};
use crate::auth::AdminCheck;
use crate::broadcast::ClientHandle;
use crate::error::ChatError;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct Joined {
    pub room: RoomName,
    pub client_id: ClientId,
    pub username: String,
    pub roles: RoleFlags,
    /// Members present before this join
    pub users: Vec<UserInfo>,
    /// History replayed to the newcomer
    pub messages: Vec<ChatMessage>,
}

impl AppState {
    /// Normalize a requested room name, falling back to the default room
    pub fn room_name(&self, requested: Option<&str>) -> RoomName {
        let trimmed = requested.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            self.config.default_room.clone()
        } else {
            truncate_chars(trimmed, self.config.max_room_name_chars)
        }
    }

    /// Register a connection in a room.
    ///
    /// Creates the room if needed, assigns a fresh client id, queues
    /// `join-success` for the newcomer and announces it to everyone else,
    /// all under the room lock so no broadcast can slip in between.
    pub async fn join_room(
        &self,
        room: Option<&str>,
        username: &str,
        password: Option<&str>,
        handle: &ClientHandle,
    ) -> Result<Joined, ChatError> {
        let username = truncate_chars(username.trim(), self.config.max_username_chars);
        if username.is_empty() {
            return Err(ChatError::InvalidName);
        }

        let is_admin = match self.admins.check(&username, password) {
            AdminCheck::Admin => true,
            AdminCheck::NotAdmin => false,
            AdminCheck::Rejected => {
                tracing::warn!(username = %username, "Admin name used with bad credentials");
                return Err(ChatError::AuthFailed);
            }
        };
        let room_name = self.room_name(room);

        let mut rooms = self.rooms.write().await;
        let room_arc = rooms
            .entry(room_name.clone())
            .or_insert_with(|| {
                tracing::info!(room = %room_name, "Creating room");
                Arc::new(Mutex::new(Room::new(
                    room_name.clone(),
                    self.config.history_capacity,
                )))
            })
            .clone();
        let mut room = room_arc.lock().await;

        // Read under the room lock: a moderator's kick or VIP push for this
        // name runs either before this check or after the insert below
        if self.is_banned(&username).await {
            if room.is_empty() {
                rooms.remove(&room_name);
            }
            tracing::info!(username = %username, "Rejected join from banned name");
            return Err(ChatError::Banned);
        }
        drop(rooms);

        let roles = RoleFlags {
            is_admin,
            is_vip: self.is_vip(&username).await,
        };

        let client_id = loop {
            let candidate = ulid::Ulid::new().to_string();
            if !room.contains(&candidate) {
                break candidate;
            }
        };

        let users = room.members();
        let messages = room.history.snapshot();

        handle.send(ServerMessage::JoinSuccess {
            client_id: client_id.clone(),
            username: username.clone(),
            room: room_name.clone(),
            is_admin: roles.is_admin,
            is_vip: roles.is_vip,
            users: users.clone(),
            messages: messages.clone(),
        });

        room.broadcast(
            &ServerMessage::UserJoined {
                client_id: client_id.clone(),
                username: username.clone(),
                is_admin: roles.is_admin,
                is_vip: roles.is_vip,
            },
            None,
        );

        room.insert(Client {
            id: client_id.clone(),
            username: username.clone(),
            roles,
            authenticated: is_admin,
            handle: handle.clone(),
        });

        tracing::info!(
            room = %room_name,
            client_id = %client_id,
            username = %username,
            is_admin = roles.is_admin,
            is_vip = roles.is_vip,
            members = room.len(),
            "Client joined"
        );

        Ok(Joined {
            room: room_name,
            client_id,
            username,
            roles,
            users,
            messages,
        })
    }

    /// Deregister a client and announce `user-left` to the rest of the room.
    ///
    /// Unknown ids are a no-op. The room is evicted once its last member leaves.
    pub async fn leave_room(&self, room_name: &str, client_id: &str) -> Option<Client> {
        let mut rooms = self.rooms.write().await;
        let room_arc = rooms.get(room_name)?.clone();
        let mut room = room_arc.lock().await;

        let client = room.remove(client_id)?;
        room.broadcast(
            &ServerMessage::UserLeft {
                client_id: client.id.clone(),
                username: client.username.clone(),
            },
            None,
        );

        tracing::info!(
            room = %room_name,
            client_id = %client.id,
            username = %client.username,
            members = room.len(),
            "Client left"
        );

        if room.is_empty() {
            rooms.remove(room_name);
            tracing::info!(room = %room_name, "Evicted empty room");
        }
        drop(room);
        drop(rooms);

        self.flood.forget(client_id).await;
        Some(client)
    }

    pub async fn lookup_client(&self, room_name: &str, client_id: &str) -> Option<Client> {
        let room = self.room(room_name).await?;
        let room = room.lock().await;
        room.get(client_id).cloned()
    }

    /// All clients in the room with this exact display name
    pub async fn find_clients_by_name(&self, room_name: &str, username: &str) -> Vec<Client> {
        let Some(room) = self.room(room_name).await else {
            return Vec::new();
        };
        let room = room.lock().await;
        room.find_by_name(username).into_iter().cloned().collect()
    }

    pub async fn room_members(&self, room_name: &str) -> Vec<UserInfo> {
        match self.room(room_name).await {
            Some(room) => room.lock().await.members(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AdminConfig;
    use crate::broadcast::Outbound;
    use std::collections::HashSet;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let Outbound::Frame(msg) = item {
                out.push(msg);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_join_rejects_blank_name() {
        let state = AppState::new();
        let (handle, mut rx) = ClientHandle::channel(8);

        let result = state.join_room(Some("R"), "   ", None, &handle).await;
        assert_eq!(result.unwrap_err(), ChatError::InvalidName);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(state.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_truncates_name() {
        let state = AppState::new();
        let (handle, _rx) = ClientHandle::channel(8);

        let long_name = "x".repeat(80);
        let joined = state
            .join_room(Some("R"), &long_name, None, &handle)
            .await
            .unwrap();
        assert_eq!(joined.username.chars().count(), 50);
    }

    #[tokio::test]
    async fn test_join_uses_default_room() {
        let state = AppState::new();
        let (handle, _rx) = ClientHandle::channel(8);

        let joined = state.join_room(None, "alice", None, &handle).await.unwrap();
        assert_eq!(joined.room, "main");

        let (handle, _rx2) = ClientHandle::channel(8);
        let joined = state
            .join_room(Some("   "), "bob", None, &handle)
            .await
            .unwrap();
        assert_eq!(joined.room, "main");
    }

    #[tokio::test]
    async fn test_first_join_gets_empty_snapshot() {
        let state = AppState::new();
        let (handle, mut rx) = ClientHandle::channel(8);

        let joined = state.join_room(Some("R"), "alice", None, &handle).await.unwrap();
        assert!(joined.users.is_empty());
        assert!(joined.messages.is_empty());

        match drain(&mut rx).as_slice() {
            [ServerMessage::JoinSuccess {
                client_id,
                users,
                messages,
                ..
            }] => {
                assert_eq!(client_id, &joined.client_id);
                assert!(users.is_empty());
                assert!(messages.is_empty());
            }
            other => panic!("Expected only join-success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_join_sees_first_and_is_announced() {
        let state = AppState::new();
        let (a, mut rx_a) = ClientHandle::channel(8);
        let (b, _rx_b) = ClientHandle::channel(8);

        let alice = state.join_room(Some("R"), "alice", None, &a).await.unwrap();
        drain(&mut rx_a);

        let bob = state.join_room(Some("R"), "bob", None, &b).await.unwrap();
        assert_eq!(bob.users.len(), 1);
        assert_eq!(bob.users[0].id, alice.client_id);

        let frames = drain(&mut rx_a);
        assert_eq!(
            frames,
            vec![ServerMessage::UserJoined {
                client_id: bob.client_id.clone(),
                username: "bob".to_string(),
                is_admin: false,
                is_vip: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_concurrent_joins_get_distinct_ids() {
        let state = AppState::new();
        let mut tasks = Vec::new();
        let mut receivers = Vec::new();

        for i in 0..64 {
            let (handle, rx) = ClientHandle::channel(128);
            receivers.push(rx);
            let state = state.clone();
            tasks.push(tokio::spawn(async move {
                state
                    .join_room(Some("R"), &format!("user{}", i), None, &handle)
                    .await
                    .map(|j| j.client_id)
            }));
        }

        let mut ids = HashSet::new();
        for task in tasks {
            let id = task.await.unwrap().unwrap();
            assert!(ids.insert(id), "duplicate client id");
        }
        assert_eq!(state.online_users().await, 64);
    }

    #[tokio::test]
    async fn test_admin_join_requires_password() {
        let state = AppState::new().with_admins(AdminConfig::new([("root", "pw")]));
        let (handle, _rx) = ClientHandle::channel(8);

        assert_eq!(
            state
                .join_room(Some("R"), "root", Some("nope"), &handle)
                .await
                .unwrap_err(),
            ChatError::AuthFailed
        );
        assert_eq!(
            state
                .join_room(Some("R"), "root", None, &handle)
                .await
                .unwrap_err(),
            ChatError::AuthFailed
        );

        let joined = state
            .join_room(Some("R"), "root", Some("pw"), &handle)
            .await
            .unwrap();
        assert!(joined.roles.is_admin);

        let client = state.lookup_client("R", &joined.client_id).await.unwrap();
        assert!(client.authenticated);
    }

    #[tokio::test]
    async fn test_password_for_regular_name_is_ignored() {
        let state = AppState::new().with_admins(AdminConfig::new([("root", "pw")]));
        let (handle, _rx) = ClientHandle::channel(8);

        let joined = state
            .join_room(Some("R"), "alice", Some("pw"), &handle)
            .await
            .unwrap();
        assert!(!joined.roles.is_admin);
    }

    #[tokio::test]
    async fn test_banned_join_leaves_no_empty_room() {
        let state = AppState::new();
        let (handle, mut rx) = ClientHandle::channel(8);
        state.ban_name("mallory").await;

        let result = state.join_room(Some("fresh"), "mallory", None, &handle).await;
        assert_eq!(result.unwrap_err(), ChatError::Banned);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(state.room_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_join_racing_ban_never_survives() {
        for _ in 0..50 {
            let state = Arc::new(AppState::new());
            let (handle, _rx) = ClientHandle::channel(8);

            let joiner = {
                let state = state.clone();
                tokio::spawn(async move {
                    let _ = state.join_room(Some("R"), "mallory", None, &handle).await;
                })
            };
            let moderator = {
                let state = state.clone();
                tokio::spawn(async move {
                    state.ban_name("mallory").await;
                    state.kick_by_name("R", "mallory", "banned").await;
                })
            };
            joiner.await.unwrap();
            moderator.await.unwrap();

            assert!(state
                .room_members("R")
                .await
                .iter()
                .all(|u| u.username != "mallory"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_join_racing_vip_grant_ends_up_vip() {
        for _ in 0..50 {
            let state = Arc::new(AppState::new());
            let (handle, _rx) = ClientHandle::channel(8);

            let joiner = {
                let state = state.clone();
                tokio::spawn(async move {
                    state
                        .join_room(Some("R"), "bob", None, &handle)
                        .await
                        .unwrap()
                })
            };
            let moderator = {
                let state = state.clone();
                tokio::spawn(async move {
                    state.grant_vip("bob").await;
                    state.push_vip_status("bob", true).await;
                })
            };
            let joined = joiner.await.unwrap();
            moderator.await.unwrap();

            let client = state.lookup_client("R", &joined.client_id).await.unwrap();
            assert!(client.roles.is_vip);
        }
    }

    #[tokio::test]
    async fn test_leave_announces_and_evicts_empty_room() {
        let state = AppState::new();
        let (a, _rx_a) = ClientHandle::channel(8);
        let (b, mut rx_b) = ClientHandle::channel(8);

        let alice = state.join_room(Some("R"), "alice", None, &a).await.unwrap();
        let bob = state.join_room(Some("R"), "bob", None, &b).await.unwrap();
        drain(&mut rx_b);

        let left = state.leave_room("R", &alice.client_id).await.unwrap();
        assert_eq!(left.username, "alice");
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMessage::UserLeft {
                client_id: alice.client_id.clone(),
                username: "alice".to_string(),
            }]
        );
        assert_eq!(state.room_count().await, 1);

        state.leave_room("R", &bob.client_id).await.unwrap();
        assert_eq!(state.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let state = AppState::new();
        let (a, _rx_a) = ClientHandle::channel(8);
        let alice = state.join_room(Some("R"), "alice", None, &a).await.unwrap();

        assert!(state.leave_room("R", "unknown").await.is_none());
        assert!(state.leave_room("nowhere", &alice.client_id).await.is_none());
        assert!(state.leave_room("R", &alice.client_id).await.is_some());
        assert!(state.leave_room("R", &alice.client_id).await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_name() {
        let state = AppState::new();
        let (a, _rx_a) = ClientHandle::channel(8);
        let (b, _rx_b) = ClientHandle::channel(8);

        let first = state.join_room(Some("R"), "alice", None, &a).await.unwrap();
        state.join_room(Some("R"), "alice", None, &b).await.unwrap();

        let found = state.lookup_client("R", &first.client_id).await.unwrap();
        assert_eq!(found.username, "alice");
        assert!(state.lookup_client("R", "missing").await.is_none());
        assert!(state.lookup_client("Other", &first.client_id).await.is_none());

        assert_eq!(state.find_clients_by_name("R", "alice").await.len(), 2);
        assert!(state.find_clients_by_name("R", "bob").await.is_empty());
        assert_eq!(state.room_members("R").await.len(), 2);
    }
}
