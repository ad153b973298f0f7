//! Event objects exchanged with websocket clients

use crate::{core::Error, store::HistoryItem};
use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

// ============================== // ClientEvent // ============================== //

/// Operations invoked by a client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "args")]
pub enum ClientEvent {
    SendMessage(String),
    CreateRoom(String),
    /// username, room
    JoinRoom(String, String),
    /// room, credential
    ClearRoomHistory(String, String),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SendMessage(_) => "SendMessage",
            ClientEvent::CreateRoom(_) => "CreateRoom",
            ClientEvent::JoinRoom(..) => "JoinRoom",
            ClientEvent::ClearRoomHistory(..) => "ClearRoomHistory",
        }
    }
}

// ============================== // ServerEvent // ============================== //

/// Events pushed to clients. Variant names are the wire names.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "args")]
pub enum ServerEvent {
    /// username, content
    ReceiveMessage(String, String),
    RoomCreated(String),
    RoomCreationFailed(String),
    RoomListUpdated(Vec<String>),
    AvailableRooms(Vec<String>),
    UsersInRoom(Vec<String>),
    JoinedRoom(String),
    UserJoined(String),
    UserLeft(String),
    MessageHistory(Vec<HistoryItem>),
    HistoryCleared,
    OperationFailed(String),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ReceiveMessage(..) => "ReceiveMessage",
            ServerEvent::RoomCreated(_) => "RoomCreated",
            ServerEvent::RoomCreationFailed(_) => "RoomCreationFailed",
            ServerEvent::RoomListUpdated(_) => "RoomListUpdated",
            ServerEvent::AvailableRooms(_) => "AvailableRooms",
            ServerEvent::UsersInRoom(_) => "UsersInRoom",
            ServerEvent::JoinedRoom(_) => "JoinedRoom",
            ServerEvent::UserJoined(_) => "UserJoined",
            ServerEvent::UserLeft(_) => "UserLeft",
            ServerEvent::MessageHistory(_) => "MessageHistory",
            ServerEvent::HistoryCleared => "HistoryCleared",
            ServerEvent::OperationFailed(_) => "OperationFailed",
        }
    }

    pub fn to_msg(&self) -> Result<Message, Error> {
        serde_json::to_string(self)
            .map(Message::Text)
            .map_err(|_| Error::SerializeMessage)
    }
}
