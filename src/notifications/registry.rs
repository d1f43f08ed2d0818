//! Connection registry owned by the hub's control loop

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Connection, ConnectionId, NotificationMessage};
use crate::domain::UserId;

struct Client {
    user_id: UserId,
    connection: Box<dyn Connection>,
}

/// Outcome of fanning one message out to a user's connections.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub evicted: usize,
}

/// Connection → user map with a per-user index kept in registration order.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<ConnectionId, Client>,
    by_user: HashMap<UserId, Vec<ConnectionId>>,
}

impl ClientRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.clients.len() }
    pub fn is_empty(&self) -> bool { self.clients.is_empty() }
    pub fn user_count(&self) -> usize { self.by_user.len() }
    pub fn contains(&self, id: ConnectionId) -> bool { self.clients.contains_key(&id) }
    pub fn user_of(&self, id: ConnectionId) -> Option<UserId> { self.clients.get(&id).map(|c| c.user_id) }

    pub fn connections_of(&self, user_id: UserId) -> &[ConnectionId] {
        self.by_user.get(&user_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds a connection. A second registration under the same id replaces
    /// and closes the first.
    pub fn insert(&mut self, id: ConnectionId, user_id: UserId, connection: Box<dyn Connection>) {
        if self.contains(id) {
            warn!(connection_id = %id, "Connection id registered twice, replacing");
            self.remove(id);
        }
        self.clients.insert(id, Client { user_id, connection });
        self.by_user.entry(user_id).or_default().push(id);
        info!(user_id = %user_id, connection_id = %id, "User connected via WebSocket");
    }

    /// Removes and closes a connection. Returns `false` when it was not present.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        let Some(mut client) = self.clients.remove(&id) else {
            debug!(connection_id = %id, "Unregister for unknown connection ignored");
            return false;
        };
        client.connection.close();
        if let Some(ids) = self.by_user.get_mut(&client.user_id) {
            ids.retain(|c| *c != id);
            if ids.is_empty() { self.by_user.remove(&client.user_id); }
        }
        info!(user_id = %client.user_id, connection_id = %id, "User disconnected from WebSocket");
        true
    }

    /// Delivers to every connection of the addressed user. A connection whose
    /// delivery fails is removed and closed; the others are unaffected.
    pub fn deliver(&mut self, message: &Arc<NotificationMessage>) -> Delivery {
        let mut outcome = Delivery::default();
        let Some(ids) = self.by_user.get(&message.user_id) else { return outcome };
        let mut failed = Vec::new();
        for id in ids {
            let Some(client) = self.clients.get_mut(id) else { continue };
            match client.connection.deliver(message) {
                Ok(()) => outcome.delivered += 1,
                Err(error) => {
                    warn!(user_id = %message.user_id, connection_id = %id, %error, "Error sending WS message");
                    failed.push(*id);
                }
            }
        }
        for id in failed {
            if self.remove(id) { outcome.evicted += 1; }
        }
        outcome
    }

    /// Closes and forgets every connection.
    pub fn close_all(&mut self) {
        for (_, mut client) in self.clients.drain() {
            client.connection.close();
        }
        self.by_user.clear();
    }
}
