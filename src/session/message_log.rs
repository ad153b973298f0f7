use super::bounded;
use crate::{
    core::{constant::SYSTEM_USER, Error},
    store::{Message, MessageKind, Store},
};
use chrono::{DateTime, Utc};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use uuid::Uuid;

/// Append-only chat log with bounded, time-ordered history reads
pub struct MessageLog {
    store: Arc<dyn Store>,
    timeout: Duration,
    history_limit: usize,
    // last assigned timestamp, stamps never go backwards
    last_stamp: Mutex<DateTime<Utc>>,
}

impl MessageLog {
    pub fn new(store: Arc<dyn Store>, timeout: Duration, history_limit: usize) -> Self {
        Self {
            store,
            timeout,
            history_limit,
            last_stamp: Mutex::new(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Build a message with a fresh id and timestamp
    pub fn stamp(&self, kind: MessageKind, room: &str, username: &str, content: &str) -> Message {
        let timestamp = {
            let mut last = self.last_stamp.lock().unwrap();
            let now = Utc::now().max(*last);
            *last = now;
            now
        };

        Message {
            id: Uuid::new_v4(),
            room: room.to_owned(),
            username: username.to_owned(),
            content: content.to_owned(),
            timestamp,
            kind,
        }
    }

    /// Persist the message. Failures are logged and swallowed, callers carry
    /// on with the broadcast regardless.
    pub async fn append(&self, message: &Message) {
        if let Err(e) = bounded(self.timeout, self.store.append_message(message)).await {
            tracing::error!(
                room = %message.room,
                kind = message.kind.as_str(),
                "failed to store message: {}",
                e
            );
        }
    }

    /// Stamp and persist a system message
    pub async fn record_system(&self, room: &str, content: &str) -> Message {
        let message = self.stamp(MessageKind::SystemMessage, room, SYSTEM_USER, content);
        self.append(&message).await;
        message
    }

    /// At most `limit` latest messages of the room, oldest first
    pub async fn history(&self, room: &str, limit: usize) -> Result<Vec<Message>, Error> {
        bounded(self.timeout, self.store.query_messages(room, limit)).await
    }

    /// History bounded by the configured limit
    pub async fn recent(&self, room: &str) -> Result<Vec<Message>, Error> {
        self.history(room, self.history_limit).await
    }

    /// Delete every stored message of the room
    pub async fn clear(&self, room: &str) -> Result<u64, Error> {
        bounded(self.timeout, self.store.delete_messages(room)).await
    }
}
