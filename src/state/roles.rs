use super::AppState;
use crate::protocol::ServerMessage;
use std::collections::HashSet;

/// Process-wide role sets keyed by display name
#[derive(Debug, Clone, Default)]
pub struct RoleState {
    pub vip: HashSet<String>,
    pub banned: HashSet<String>,
}

impl AppState {
    pub async fn is_vip(&self, username: &str) -> bool {
        self.roles.read().await.vip.contains(username)
    }

    pub async fn is_banned(&self, username: &str) -> bool {
        self.roles.read().await.banned.contains(username)
    }

    /// Returns false if the name already had VIP
    pub async fn grant_vip(&self, username: &str) -> bool {
        self.roles.write().await.vip.insert(username.to_string())
    }

    /// Returns false if the name was not a VIP
    pub async fn revoke_vip(&self, username: &str) -> bool {
        self.roles.write().await.vip.remove(username)
    }

    pub async fn ban_name(&self, username: &str) -> bool {
        self.roles.write().await.banned.insert(username.to_string())
    }

    pub async fn unban_name(&self, username: &str) -> bool {
        self.roles.write().await.banned.remove(username)
    }

    /// Update the VIP flag of every connected client with this name, in any
    /// room, and push `user-role` to each. Returns how many were updated.
    pub async fn push_vip_status(&self, username: &str, is_vip: bool) -> usize {
        let rooms: Vec<_> = self.rooms.read().await.values().cloned().collect();
        let mut updated = 0;
        for room in rooms {
            let mut room = room.lock().await;
            for client in room.clients_mut().filter(|c| c.username == username) {
                client.roles.is_vip = is_vip;
                client.handle.send(ServerMessage::UserRole {
                    is_admin: client.roles.is_admin,
                    is_vip,
                });
                updated += 1;
            }
        }
        updated
    }
}
