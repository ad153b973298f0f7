//! PostgreSQL backed store

use super::{Connection, Message, Room, Store};
use crate::core::Error;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

mod connection;
mod message;
mod room;

// ========================// PgStore //======================== //

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and run migrations
    pub async fn new(database_url: &str) -> Result<Self, Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;

        sqlx::migrate!().run(&pool).await?;
        tracing::info!("db migrated successfully");

        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_connection(&self, connection_id: &str) -> Result<Option<Connection>, Error> {
        self.fetch_connection(connection_id).await
    }

    async fn put_connection(&self, connection: &Connection) -> Result<(), Error> {
        self.upsert_connection(connection).await
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), Error> {
        self.remove_connection(connection_id).await
    }

    async fn find_connections_by_room(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<Connection>, Error> {
        self.room_connections(room, limit).await
    }

    async fn clear_connections(&self) -> Result<u64, Error> {
        self.remove_all_connections().await
    }

    async fn find_room_by_name(&self, name: &str) -> Result<Option<Room>, Error> {
        self.fetch_room(name).await
    }

    async fn insert_room(&self, room: &Room) -> Result<(), Error> {
        self.create_room(room).await
    }

    async fn list_rooms(&self, limit: usize) -> Result<Vec<Room>, Error> {
        self.fetch_rooms(limit).await
    }

    async fn append_message(&self, message: &Message) -> Result<(), Error> {
        self.create_message(message).await
    }

    async fn query_messages(&self, room: &str, limit: usize) -> Result<Vec<Message>, Error> {
        self.latest_messages(room, limit).await
    }

    async fn delete_messages(&self, room: &str) -> Result<u64, Error> {
        self.remove_messages(room).await
    }
}
