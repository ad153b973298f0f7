use super::bounded;
use crate::{
    core::Error,
    store::{Connection, Store},
};
use std::{sync::Arc, time::Duration};

/// Which connection is in which room.
///
/// Only the session coordinator mutates it, always together with the
/// transport group membership.
pub struct ConnectionRegistry {
    store: Arc<dyn Store>,
    timeout: Duration,
    max_occupants: usize,
}

impl ConnectionRegistry {
    pub fn new(store: Arc<dyn Store>, timeout: Duration, max_occupants: usize) -> Self {
        Self {
            store,
            timeout,
            max_occupants,
        }
    }

    pub async fn get(&self, connection_id: &str) -> Result<Option<Connection>, Error> {
        bounded(self.timeout, self.store.get_connection(connection_id)).await
    }

    /// Overwrites any prior record of the connection
    pub async fn upsert(&self, connection_id: &str, username: &str, room: &str) -> Result<(), Error> {
        let connection = Connection::new(connection_id, username, room);
        bounded(self.timeout, self.store.put_connection(&connection)).await
    }

    /// No-op when the connection is unknown
    pub async fn remove(&self, connection_id: &str) -> Result<(), Error> {
        bounded(self.timeout, self.store.delete_connection(connection_id)).await
    }

    /// Usernames of the connections in the room
    pub async fn occupants(&self, room: &str) -> Result<Vec<String>, Error> {
        let connections = bounded(
            self.timeout,
            self.store.find_connections_by_room(room, self.max_occupants),
        )
        .await?;

        Ok(connections.into_iter().map(|c| c.username).collect())
    }

    /// Forget records left behind by a previous process
    pub async fn purge(&self) -> Result<u64, Error> {
        bounded(self.timeout, self.store.clear_connections()).await
    }
}
