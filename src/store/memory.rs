//! In-process store, used when no database is configured and in tests

use super::{Connection, Message, Room, Store};
use crate::core::{validator::room_key, Error};
use async_trait::async_trait;
use std::{
    collections::{btree_map::Entry, BTreeMap, HashMap},
    sync::Mutex,
};

#[derive(Default)]
pub struct MemoryStore {
    connections: Mutex<HashMap<String, Connection>>,
    // keyed by the lower-cased name, which keeps the listing sorted
    rooms: Mutex<BTreeMap<String, Room>>,
    messages: Mutex<Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, Error> {
        let connections = self.connections.lock().unwrap();
        Ok(connections.get(connection_id).cloned())
    }

    async fn put_connection(&self, connection: &Connection) -> Result<(), Error> {
        let mut connections = self.connections.lock().unwrap();
        connections.insert(connection.connection_id.clone(), connection.clone());
        Ok(())
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), Error> {
        let mut connections = self.connections.lock().unwrap();
        connections.remove(connection_id);
        Ok(())
    }

    async fn find_connections_by_room(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<Connection>, Error> {
        let connections = self.connections.lock().unwrap();

        let mut found: Vec<Connection> = connections
            .values()
            .filter(|c| c.room == room)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.username.cmp(&b.username));
        found.truncate(limit);

        Ok(found)
    }

    async fn clear_connections(&self) -> Result<u64, Error> {
        let mut connections = self.connections.lock().unwrap();
        let total = connections.len() as u64;
        connections.clear();
        Ok(total)
    }

    async fn find_room_by_name(&self, name: &str) -> Result<Option<Room>, Error> {
        let rooms = self.rooms.lock().unwrap();
        Ok(rooms.get(&room_key(name)).cloned())
    }

    async fn insert_room(&self, room: &Room) -> Result<(), Error> {
        let mut rooms = self.rooms.lock().unwrap();

        match rooms.entry(room.key()) {
            Entry::Occupied(_) => Err(Error::RoomExists(room.name.clone())),
            Entry::Vacant(v) => {
                v.insert(room.clone());
                Ok(())
            }
        }
    }

    async fn list_rooms(&self, limit: usize) -> Result<Vec<Room>, Error> {
        let rooms = self.rooms.lock().unwrap();
        Ok(rooms.values().take(limit).cloned().collect())
    }

    async fn append_message(&self, message: &Message) -> Result<(), Error> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(message.clone());
        Ok(())
    }

    async fn query_messages(&self, room: &str, limit: usize) -> Result<Vec<Message>, Error> {
        let messages = self.messages.lock().unwrap();

        let mut found: Vec<Message> = messages
            .iter()
            .filter(|m| m.room == room)
            .cloned()
            .collect();
        // stable sort, equal timestamps keep their append order
        found.sort_by_key(|m| m.timestamp);

        let skip = found.len().saturating_sub(limit);
        Ok(found.split_off(skip))
    }

    async fn delete_messages(&self, room: &str) -> Result<u64, Error> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.room != room);
        Ok((before - messages.len()) as u64)
    }
}
