use super::PgStore;
use crate::{
    core::Error,
    store::{Message, MessageKind},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

// ========================// Message Store //======================== //

impl PgStore {
    pub(super) async fn create_message(&self, message: &Message) -> Result<(), Error> {
        sqlx::query(
            r#"
                INSERT INTO messages (id, room, username, content, kind, sent_at)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(&message.room)
        .bind(&message.username)
        .bind(&message.content)
        .bind(message.kind.as_str())
        .bind(message.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Latest messages of the room, oldest first. `seq` breaks timestamp ties
    /// by insertion order.
    pub(super) async fn latest_messages(
        &self,
        room: &str,
        limit: usize,
    ) -> Result<Vec<Message>, Error> {
        let messages = sqlx::query_as::<_, MessageRow>(
            r#"
                SELECT id, room, username, content, kind, sent_at
                FROM (
                    SELECT seq, id, room, username, content, kind, sent_at
                    FROM messages
                    WHERE room = $1
                    ORDER BY sent_at DESC, seq DESC
                    LIMIT $2
                ) AS latest
                ORDER BY sent_at, seq
            "#,
        )
        .bind(room)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(|v| v.into()).collect())?;

        Ok(messages)
    }

    pub(super) async fn remove_messages(&self, room: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM messages WHERE room = $1")
            .bind(room)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// ========================// Conversions //======================== //

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    room: String,
    username: String,
    content: String,
    kind: String,
    sent_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(v: MessageRow) -> Self {
        Self {
            id: v.id,
            room: v.room,
            username: v.username,
            content: v.content,
            kind: MessageKind::from(v.kind.as_str()),
            timestamp: v.sent_at,
        }
    }
}
