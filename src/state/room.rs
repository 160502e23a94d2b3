use crate::broadcast::{fan_out, ClientHandle};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::{HashMap, VecDeque};

/// A registered connection
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub username: String,
    pub roles: RoleFlags,
    /// True when the join presented valid admin credentials
    pub authenticated: bool,
    pub handle: ClientHandle,
}

impl Client {
    pub fn info(&self) -> UserInfo {
        UserInfo {
            id: self.id.clone(),
            username: self.username.clone(),
            is_admin: self.roles.is_admin,
            is_vip: self.roles.is_vip,
        }
    }
}

/// Fixed-capacity message log, oldest evicted first
#[derive(Debug, Clone)]
pub struct History {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, msg: ChatMessage) {
        if self.capacity == 0 {
            return;
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(msg);
    }

    /// Oldest first
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Registry and history of one room. Always accessed under the room's lock.
#[derive(Debug)]
pub struct Room {
    pub name: RoomName,
    clients: HashMap<ClientId, Client>,
    pub history: History,
}

impl Room {
    pub fn new(name: RoomName, history_capacity: usize) -> Self {
        Self {
            name,
            clients: HashMap::new(),
            history: History::new(history_capacity),
        }
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    pub fn insert(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    pub fn remove(&mut self, client_id: &str) -> Option<Client> {
        self.clients.remove(client_id)
    }

    pub fn get(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn get_mut(&mut self, client_id: &str) -> Option<&mut Client> {
        self.clients.get_mut(client_id)
    }

    /// Every client whose display name matches exactly
    pub fn find_by_name(&self, username: &str) -> Vec<&Client> {
        self.clients
            .values()
            .filter(|c| c.username == username)
            .collect()
    }

    pub fn clients_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.values_mut()
    }

    pub fn members(&self) -> Vec<UserInfo> {
        self.clients.values().map(Client::info).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Send to every member except `exclude`; returns the number reached
    pub fn broadcast(&self, msg: &ServerMessage, exclude: Option<&str>) -> usize {
        let delivered = fan_out(
            self.clients.iter().map(|(id, c)| (id, &c.handle)),
            msg,
            exclude,
        );
        tracing::debug!(room = %self.name, delivered, "Broadcast");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(n: usize) -> ChatMessage {
        ChatMessage {
            id: format!("m{}", n),
            username: "alice".to_string(),
            text: format!("message {}", n),
            timestamp: "2024-01-01T00:00:00.000Z".to_string(),
            is_admin: false,
            is_vip: false,
        }
    }

    fn client(
        id: &str,
        name: &str,
    ) -> (Client, tokio::sync::mpsc::Receiver<crate::broadcast::Outbound>) {
        let (handle, rx) = ClientHandle::channel(8);
        (
            Client {
                id: id.to_string(),
                username: name.to_string(),
                roles: RoleFlags::default(),
                authenticated: false,
                handle,
            },
            rx,
        )
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut history = History::new(50);
        for n in 0..51 {
            history.push(message(n));
        }

        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 50);
        assert_eq!(snapshot.first().unwrap().id, "m1");
        assert_eq!(snapshot.last().unwrap().id, "m50");
        assert!(snapshot.iter().all(|m| m.id != "m0"));
        // Order is preserved
        for (i, msg) in snapshot.iter().enumerate() {
            assert_eq!(msg.id, format!("m{}", i + 1));
        }
    }

    #[test]
    fn test_history_never_exceeds_capacity() {
        let mut history = History::new(3);
        for n in 0..10 {
            history.push(message(n));
            assert!(history.len() <= 3);
        }
    }

    #[test]
    fn test_zero_capacity_history_stores_nothing() {
        let mut history = History::new(0);
        history.push(message(1));
        assert!(history.is_empty());
    }

    #[test]
    fn test_find_by_name_returns_all_matches() {
        let mut room = Room::new("R".to_string(), 10);
        let (a, _rx_a) = client("1", "alice");
        let (b, _rx_b) = client("2", "alice");
        let (c, _rx_c) = client("3", "bob");
        room.insert(a);
        room.insert(b);
        room.insert(c);

        assert_eq!(room.find_by_name("alice").len(), 2);
        assert_eq!(room.find_by_name("Alice").len(), 0);
        assert_eq!(room.members().len(), 3);
    }

    #[test]
    fn test_remove_unknown_client_is_noop() {
        let mut room = Room::new("R".to_string(), 10);
        assert!(room.remove("ghost").is_none());
        assert!(room.is_empty());
    }

    #[test]
    fn test_room_broadcast_excludes_sender() {
        let mut room = Room::new("R".to_string(), 10);
        let (a, mut rx_a) = client("1", "alice");
        let (b, mut rx_b) = client("2", "bob");
        room.insert(a);
        room.insert(b);

        let delivered = room.broadcast(&ServerMessage::system("hi"), Some("1"));
        assert_eq!(delivered, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }
}
