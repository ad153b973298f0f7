use axum::extract::ws::Message;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Write half of one websocket connection
#[derive(Clone)]
pub struct Client {
    id: String,
    tx: mpsc::Sender<Message>,
}

impl Client {
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tx(&self) -> mpsc::Sender<Message> {
        self.tx.clone()
    }
}
