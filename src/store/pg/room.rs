use super::PgStore;
use crate::{
    core::{validator::room_key, Error, ResultExt},
    store::Room,
};

const UNIQUE_ROOM_NAME: &str = "rooms_name_key_key";

// ========================// Room Store //======================== //

impl PgStore {
    pub(super) async fn fetch_room(&self, name: &str) -> Result<Option<Room>, Error> {
        let room = sqlx::query_as::<_, Room>(
            r#"
                SELECT id, name
                FROM rooms
                WHERE name_key = $1
            "#,
        )
        .bind(room_key(name))
        .fetch_optional(&self.pool)
        .await?;

        Ok(room)
    }

    /// Create a room, the unique index on `name_key` rejects duplicates
    /// differing only in case
    pub(super) async fn create_room(&self, room: &Room) -> Result<(), Error> {
        sqlx::query(
            r#"
                INSERT INTO rooms (id, name, name_key)
                VALUES ($1, $2, $3)
            "#,
        )
        .bind(room.id)
        .bind(&room.name)
        .bind(room.key())
        .execute(&self.pool)
        .await
        .on_constraint(UNIQUE_ROOM_NAME, &room.name)?;

        Ok(())
    }

    pub(super) async fn fetch_rooms(&self, limit: usize) -> Result<Vec<Room>, Error> {
        let rooms = sqlx::query_as::<_, Room>(
            r#"
                SELECT id, name
                FROM rooms
                ORDER BY name_key
                LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }
}
