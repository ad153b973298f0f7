//! Defines the persistent store used by the session layer.

use crate::core::Error;
use async_trait::async_trait;

mod memory;
mod model;
mod pg;

pub use memory::MemoryStore;
pub use model::*;
pub use pg::PgStore;

/// Document store holding connection records, rooms and the message log
#[async_trait]
pub trait Store: Send + Sync {
    // Connections
    async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, Error>;
    async fn put_connection(&self, connection: &Connection) -> Result<(), Error>;
    async fn delete_connection(&self, connection_id: &str) -> Result<(), Error>;
    /// Connections registered to the room, sorted by username
    async fn find_connections_by_room(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<Connection>, Error>;
    /// Drop every connection record, returning how many were removed
    async fn clear_connections(&self) -> Result<u64, Error>;

    // Rooms
    /// Case-insensitive lookup by name
    async fn find_room_by_name(&self, name: &str) -> Result<Option<Room>, Error>;
    /// Insert the room unless one with the same case-insensitive name exists,
    /// in which case `Error::RoomExists` is returned
    async fn insert_room(&self, room: &Room) -> Result<(), Error>;
    /// Rooms sorted ascending by case-insensitive name
    async fn list_rooms(&self, limit: usize) -> Result<Vec<Room>, Error>;

    // Messages
    async fn append_message(&self, message: &Message) -> Result<(), Error>;
    /// The latest `limit` messages of the room in ascending time order
    async fn query_messages(&self, room: &str, limit: usize) -> Result<Vec<Message>, Error>;
    async fn delete_messages(&self, room: &str) -> Result<u64, Error>;
}
