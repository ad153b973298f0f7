use crate::core::validator::room_key;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================= // Connection // ========================= //

/// A live client session and the room it currently belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Connection {
    pub connection_id: String,
    pub username: String,
    pub room: String,
}

impl Connection {
    pub fn new(connection_id: &str, username: &str, room: &str) -> Self {
        Self {
            connection_id: connection_id.to_owned(),
            username: username.to_owned(),
            room: room.to_owned(),
        }
    }
}

// ========================= // Room // ========================= //

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
}

impl Room {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
        }
    }

    /// Lower-cased name, unique across all rooms
    pub fn key(&self) -> String {
        room_key(&self.name)
    }
}

// ========================= // Message // ========================= //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    UserMessage,
    SystemMessage,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::UserMessage => "UserMessage",
            MessageKind::SystemMessage => "SystemMessage",
        }
    }
}

impl From<&str> for MessageKind {
    fn from(value: &str) -> Self {
        match value {
            "SystemMessage" => MessageKind::SystemMessage,
            _ => MessageKind::UserMessage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub room: String,
    pub username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
}

/// Entry of the `MessageHistory` event
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for HistoryItem {
    fn from(msg: &Message) -> Self {
        Self {
            kind: msg.kind.as_str(),
            user: msg.username.clone(),
            text: msg.content.clone(),
            timestamp: msg.timestamp,
        }
    }
}
