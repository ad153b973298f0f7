use super::{bounded, KeyedLocks};
use crate::{
    core::{
        validator::{normalize_room_name, room_key},
        Error,
    },
    store::{Room, Store},
};
use std::{sync::Arc, time::Duration};

/// Rooms by name. Names are unique regardless of case.
pub struct RoomDirectory {
    store: Arc<dyn Store>,
    timeout: Duration,
    list_limit: usize,
    creating: KeyedLocks,
}

impl RoomDirectory {
    pub fn new(store: Arc<dyn Store>, timeout: Duration, list_limit: usize) -> Self {
        Self {
            store,
            timeout,
            list_limit,
            creating: KeyedLocks::new(),
        }
    }

    /// Room names in case-insensitive alphabetical order, capped by the list limit
    pub async fn list_names(&self) -> Result<Vec<String>, Error> {
        let rooms = bounded(self.timeout, self.store.list_rooms(self.list_limit)).await?;
        Ok(rooms.into_iter().map(|r| r.name).collect())
    }

    pub async fn find(&self, name: &str) -> Result<Option<Room>, Error> {
        bounded(self.timeout, self.store.find_room_by_name(name)).await
    }

    pub async fn exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.find(name).await?.is_some())
    }

    /// Create the room, or fail with `Error::RoomExists`.
    ///
    /// Creation of one name is serialized, so of two racing requests for the
    /// same case-insensitive name exactly one succeeds. A failed existence
    /// check aborts the creation.
    pub async fn create(&self, name: &str) -> Result<Room, Error> {
        let key = room_key(name);
        let guard = self.creating.lock(&key).await;
        let result = self.create_locked(name).await;
        drop(guard);
        self.creating.forget(&key);
        result
    }

    async fn create_locked(&self, name: &str) -> Result<Room, Error> {
        let name = normalize_room_name(name);
        if self.exists(&name).await? {
            return Err(Error::RoomExists(name));
        }

        let room = Room::new(&name);
        bounded(self.timeout, self.store.insert_room(&room)).await?;
        tracing::info!("room '{}' created", room.name);
        Ok(room)
    }

    /// Create the room unless it already exists, returning the stored room
    pub async fn ensure(&self, name: &str) -> Result<Room, Error> {
        match self.create(name).await {
            Ok(room) => Ok(room),
            Err(Error::RoomExists(_)) => self.find(name).await?.ok_or(Error::NotFound),
            Err(e) => Err(e),
        }
    }
}
