//! Routes socket events between connections.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::events::{ClientEvent, DirectMessage, IncomingMessage, RoomRoster, ServerEvent};
use crate::format::format_message;
use crate::presence::PresenceRegistry;
use crate::rooms::{RoomRegistry, RoomUser};
use crate::ConnectionId;

pub const WELCOME_TEXT: &str = "Welcome to CareLink chat!";
pub const IMPERSONATION_TEXT: &str = "Not authorized to act as another user";

pub struct ChatHub {
    presence: PresenceRegistry,
    rooms: RoomRegistry,
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<ServerEvent>>>,
    /// Account ids of sockets that authenticated on upgrade.
    identities: RwLock<HashMap<ConnectionId, String>>,
    bot_name: String,
}

impl ChatHub {
    pub fn new(bot_name: impl Into<String>) -> Self {
        Self {
            presence: PresenceRegistry::new(),
            rooms: RoomRegistry::new(),
            connections: RwLock::new(HashMap::new()),
            identities: RwLock::new(HashMap::new()),
            bot_name: bot_name.into(),
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Register the outbound queue of a freshly opened socket.
    pub async fn connect(&self, connection: ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        self.connections.write().await.insert(connection, sender);
        debug!(%connection, "socket connected");
    }

    /// Tie a socket to an authenticated account. Such a socket may only
    /// register and send messages as that account.
    pub async fn bind_identity(&self, connection: ConnectionId, user_id: impl Into<String>) {
        let user_id = user_id.into();
        debug!(%connection, user = %user_id, "socket bound to account");
        self.identities.write().await.insert(connection, user_id);
    }

    /// Forget a socket: its presence entries, its room membership and its queue.
    pub async fn disconnect(&self, connection: ConnectionId) {
        self.connections.write().await.remove(&connection);
        self.identities.write().await.remove(&connection);

        let removed = self.presence.remove_connection(connection).await;
        if !removed.is_empty() {
            info!(%connection, users = ?removed, "users went offline");
            self.broadcast_users().await;
        }

        if let Some(user) = self.rooms.leave(connection).await {
            self.announce_departure(&user).await;
        }
        debug!(%connection, "socket disconnected");
    }

    pub async fn handle(&self, connection: ConnectionId, event: ClientEvent) {
        let claimed = match &event {
            ClientEvent::AddUser(user_id) => Some(user_id.trim()),
            ClientEvent::SendMessage(message) => Some(message.sender_id.as_str()),
            _ => None,
        };
        if let Some(claimed) = claimed {
            if !self.may_act_as(connection, claimed).await {
                warn!(%connection, claimed, "socket tried to act as another user");
                self.send_to(connection, ServerEvent::error(IMPERSONATION_TEXT))
                    .await;
                return;
            }
        }

        match event {
            ClientEvent::AddUser(user_id) => self.add_user(connection, &user_id).await,
            ClientEvent::SendMessage(message) => self.send_message(connection, message).await,
            ClientEvent::JoinRoom(join) => self.join_room(connection, &join.username, &join.room).await,
            ClientEvent::ChatMessage(text) => self.chat_message(connection, &text).await,
            ClientEvent::Ping => self.send_to(connection, ServerEvent::Pong).await,
        }
    }

    /// Register the user if absent, then tell everyone who is online.
    pub async fn add_user(&self, connection: ConnectionId, user_id: &str) {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            self.send_to(connection, ServerEvent::error("User id is required"))
                .await;
            return;
        }

        if self.presence.add_user(user_id, connection).await {
            info!(%connection, user = user_id, "user online");
        }
        self.broadcast_users().await;
    }

    /// Deliver a direct message to the receiver's socket only. Offline
    /// receivers do not get it.
    pub async fn send_message(&self, connection: ConnectionId, message: DirectMessage) {
        let Some(receiver) = self.presence.get_user(&message.receiver_id).await else {
            debug!(%connection, receiver = %message.receiver_id, "receiver offline, message dropped");
            return;
        };

        self.send_to(
            receiver.socket_id,
            ServerEvent::GetMessage(IncomingMessage {
                sender_id: message.sender_id,
                text: message.text,
            }),
        )
        .await;
    }

    pub async fn join_room(&self, connection: ConnectionId, username: &str, room: &str) {
        let (username, room) = (username.trim(), room.trim());
        if username.is_empty() || room.is_empty() {
            self.send_to(
                connection,
                ServerEvent::error("Username and room are required"),
            )
            .await;
            return;
        }

        let outcome = self.rooms.join(connection, username, room).await;
        if let Some(previous) = outcome.previous {
            self.announce_departure(&previous).await;
        }
        info!(%connection, username, room, "joined room");

        self.send_to(
            connection,
            ServerEvent::Message(format_message(&self.bot_name, WELCOME_TEXT)),
        )
        .await;

        let joined = ServerEvent::Message(format_message(
            &self.bot_name,
            &format!("{username} has joined the chat"),
        ));
        self.broadcast_room(room, joined, Some(connection)).await;
        self.broadcast_roster(room).await;
    }

    /// Relay room text. Sockets that never joined a room are ignored.
    pub async fn chat_message(&self, connection: ConnectionId, text: &str) {
        let Some(user) = self.rooms.current(connection).await else {
            debug!(%connection, "chat message from socket outside any room");
            return;
        };

        let line = ServerEvent::Message(format_message(&user.username, text));
        self.broadcast_room(&user.room, line, None).await;
    }

    async fn may_act_as(&self, connection: ConnectionId, user_id: &str) -> bool {
        match self.identities.read().await.get(&connection) {
            Some(bound) => bound == user_id,
            None => true,
        }
    }

    pub async fn report_error(&self, connection: ConnectionId, message: &str) {
        self.send_to(connection, ServerEvent::error(message)).await;
    }

    async fn announce_departure(&self, user: &RoomUser) {
        let left = ServerEvent::Message(format_message(
            &self.bot_name,
            &format!("{} has left the chat", user.username),
        ));
        self.broadcast_room(&user.room, left, None).await;
        self.broadcast_roster(&user.room).await;
    }

    async fn broadcast_users(&self) {
        let users = self.presence.snapshot().await;
        self.broadcast(ServerEvent::GetUsers(users)).await;
    }

    async fn broadcast_roster(&self, room: &str) {
        let users = self.rooms.room_users(room).await;
        let roster = ServerEvent::RoomUsers(RoomRoster {
            room: room.to_string(),
            users,
        });
        self.broadcast_room(room, roster, None).await;
    }

    async fn send_to(&self, connection: ConnectionId, event: ServerEvent) {
        let sender = self.connections.read().await.get(&connection).cloned();
        match sender {
            Some(sender) => deliver(connection, &sender, event),
            None => debug!(%connection, "no socket for outbound event"),
        }
    }

    async fn broadcast(&self, event: ServerEvent) {
        let targets: Vec<_> = self
            .connections
            .read()
            .await
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();
        for (connection, sender) in targets {
            deliver(connection, &sender, event.clone());
        }
    }

    async fn broadcast_room(&self, room: &str, event: ServerEvent, except: Option<ConnectionId>) {
        let members = self.rooms.room_users(room).await;
        let targets: Vec<_> = {
            let connections = self.connections.read().await;
            members
                .iter()
                .filter(|member| Some(member.id) != except)
                .filter_map(|member| connections.get(&member.id).map(|s| (member.id, s.clone())))
                .collect()
        };
        for (connection, sender) in targets {
            deliver(connection, &sender, event.clone());
        }
    }
}

/// Queue without waiting. A full queue means the socket is not keeping up;
/// the event is dropped for that socket only.
fn deliver(connection: ConnectionId, sender: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
    if let Err(err) = sender.try_send(event) {
        match err {
            mpsc::error::TrySendError::Full(_) => {
                warn!(%connection, "outbound queue full, dropping event")
            }
            mpsc::error::TrySendError::Closed(_) => {
                debug!(%connection, "outbound queue closed")
            }
        }
    }
}
