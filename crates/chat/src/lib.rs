//! Real-time chat for CareLink.
//!
//! Two registries back the chat: a presence map from user id to the socket
//! that announced it, and a room map from socket to the room it joined.
//! [`ChatHub`] ties them to the outbound queue of every live socket. The
//! transport itself lives in the HTTP crate; this crate only sees events.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod events;
pub mod format;
pub mod hub;
pub mod presence;
pub mod rooms;

pub use events::{ChatLine, ClientEvent, DirectMessage, IncomingMessage, JoinRoom, RoomRoster, ServerEvent};
pub use hub::ChatHub;
pub use presence::{OnlineUser, PresenceRegistry};
pub use rooms::{JoinOutcome, RoomRegistry, RoomUser};

/// Identifies one live socket for the lifetime of its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
