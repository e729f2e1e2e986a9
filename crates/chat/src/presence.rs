//! Who is online, and on which socket.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: String,
    pub socket_id: ConnectionId,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    connection: ConnectionId,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

/// User id to socket map. The first socket to announce a user keeps it until
/// that socket goes away.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    state: RwLock<State>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user_id` on `connection` unless the user is already online.
    /// Returns whether an entry was added.
    pub async fn add_user(&self, user_id: &str, connection: ConnectionId) -> bool {
        let mut state = self.state.write().await;
        if state.entries.contains_key(user_id) {
            return false;
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .entries
            .insert(user_id.to_string(), Entry { connection, seq });
        true
    }

    /// Drop every user registered on `connection`, returning their ids.
    pub async fn remove_connection(&self, connection: ConnectionId) -> Vec<String> {
        let mut state = self.state.write().await;
        let removed: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.connection == connection)
            .map(|(user_id, _)| user_id.clone())
            .collect();
        for user_id in &removed {
            state.entries.remove(user_id);
        }
        removed
    }

    pub async fn get_user(&self, user_id: &str) -> Option<OnlineUser> {
        let state = self.state.read().await;
        state.entries.get(user_id).map(|entry| OnlineUser {
            user_id: user_id.to_string(),
            socket_id: entry.connection,
        })
    }

    /// Every online user in registration order.
    pub async fn snapshot(&self) -> Vec<OnlineUser> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
            .into_iter()
            .map(|(user_id, entry)| OnlineUser {
                user_id: user_id.clone(),
                socket_id: entry.connection,
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
