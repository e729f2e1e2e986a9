//! Socket frames. Every frame is a JSON object `{"event": name, "data": payload}`.

use serde::{Deserialize, Serialize};

use crate::presence::OnlineUser;
use crate::rooms::RoomUser;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Announce the user id this socket speaks for.
    AddUser(String),
    SendMessage(DirectMessage),
    JoinRoom(JoinRoom),
    /// Text for the room this socket joined.
    ChatMessage(String),
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoom {
    pub username: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    GetUsers(Vec<OnlineUser>),
    GetMessage(IncomingMessage),
    Message(ChatLine),
    RoomUsers(RoomRoster),
    Pong,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    pub sender_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLine {
    pub username: String,
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRoster {
    pub room: String,
    pub users: Vec<RoomUser>,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
