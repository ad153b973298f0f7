use super::PgStore;
use crate::{core::Error, store::Connection};

// ========================// Connection Store //======================== //

impl PgStore {
    pub(super) async fn fetch_connection(
        &self,
        connection_id: &str,
    ) -> Result<Option<Connection>, Error> {
        let connection = sqlx::query_as::<_, Connection>(
            r#"
                SELECT connection_id, username, room
                FROM connections
                WHERE connection_id = $1
            "#,
        )
        .bind(connection_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(connection)
    }

    /// Insert the record or overwrite the one with the same id
    pub(super) async fn upsert_connection(&self, connection: &Connection) -> Result<(), Error> {
        sqlx::query(
            r#"
                INSERT INTO connections (connection_id, username, room)
                VALUES ($1, $2, $3)
                ON CONFLICT (connection_id)
                DO UPDATE SET username = EXCLUDED.username, room = EXCLUDED.room
            "#,
        )
        .bind(&connection.connection_id)
        .bind(&connection.username)
        .bind(&connection.room)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub(super) async fn remove_connection(&self, connection_id: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM connections WHERE connection_id = $1")
            .bind(connection_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub(super) async fn room_connections(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<Connection>, Error> {
        let connections = sqlx::query_as::<_, Connection>(
            r#"
                SELECT connection_id, username, room
                FROM connections
                WHERE room = $1
                ORDER BY username
                LIMIT $2
            "#,
        )
        .bind(room)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(connections)
    }

    pub(super) async fn remove_all_connections(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM connections")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
