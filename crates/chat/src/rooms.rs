//! Room membership for group chat.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomUser {
    pub id: ConnectionId,
    pub username: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub user: RoomUser,
    /// The membership this join replaced, if the socket was already in a room.
    pub previous: Option<RoomUser>,
}

/// Socket to room membership, kept in join order. A socket is in at most one room.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    members: RwLock<Vec<RoomUser>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(&self, connection: ConnectionId, username: &str, room: &str) -> JoinOutcome {
        let mut members = self.members.write().await;
        let previous = members
            .iter()
            .position(|member| member.id == connection)
            .map(|index| members.remove(index));

        let user = RoomUser {
            id: connection,
            username: username.to_string(),
            room: room.to_string(),
        };
        members.push(user.clone());
        JoinOutcome { user, previous }
    }

    pub async fn current(&self, connection: ConnectionId) -> Option<RoomUser> {
        self.members
            .read()
            .await
            .iter()
            .find(|member| member.id == connection)
            .cloned()
    }

    pub async fn leave(&self, connection: ConnectionId) -> Option<RoomUser> {
        let mut members = self.members.write().await;
        members
            .iter()
            .position(|member| member.id == connection)
            .map(|index| members.remove(index))
    }

    pub async fn room_users(&self, room: &str) -> Vec<RoomUser> {
        self.members
            .read()
            .await
            .iter()
            .filter(|member| member.room == room)
            .cloned()
            .collect()
    }
}
