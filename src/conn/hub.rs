use super::{client::Client, Transport};
use crate::session::ServerEvent;
use async_trait::async_trait;
use axum::extract::ws::Message;
use std::collections::{hash_map::Entry, HashMap, HashSet};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    RwLock,
};

// ========================// HubState //======================== //

#[derive(Default)]
struct HubState {
    clients: HashMap<String, mpsc::Sender<Message>>,
    groups: HashMap<String, HashSet<String>>,
}

impl HubState {
    fn group_senders(&self, group: &str) -> Vec<(String, mpsc::Sender<Message>)> {
        let Some(members) = self.groups.get(group) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| self.clients.get(id).map(|tx| (id.clone(), tx.clone())))
            .collect()
    }

    fn leave(&mut self, connection_id: &str, group: &str) {
        if let Entry::Occupied(mut o) = self.groups.entry(group.to_owned()) {
            let members = o.get_mut();
            members.remove(connection_id);
            if members.is_empty() {
                o.remove();
            }
        }
    }
}

// ========================// ChannelHub //======================== //

/// In-process transport: one mpsc channel per connection and a membership
/// table grouping connections by room.
#[derive(Default)]
pub struct ChannelHub {
    inner: RwLock<HubState>,
}

impl ChannelHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, client: &Client) {
        let mut inner = self.inner.write().await;
        inner.clients.insert(client.id().to_owned(), client.tx());
    }

    /// Drop the connection's channel and every group membership it still has
    pub async fn unregister(&self, connection_id: &str) {
        let mut inner = self.inner.write().await;
        inner.groups.retain(|_, members| {
            members.remove(connection_id);
            !members.is_empty()
        });
        inner.clients.remove(connection_id);
    }

    pub async fn num_clients(&self) -> usize {
        self.inner.read().await.clients.len()
    }

    /// Connection ids in the group, sorted
    #[cfg(test)]
    pub async fn members(&self, group: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut members: Vec<String> = inner
            .groups
            .get(group)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Groups the connection belongs to, sorted
    #[cfg(test)]
    pub async fn groups_of(&self, connection_id: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut names: Vec<String> = inner
            .groups
            .iter()
            .filter(|(_, members)| members.contains(connection_id))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Deliver without waiting on slow readers, delivery is best effort
    fn deliver(senders: Vec<(String, mpsc::Sender<Message>)>, event: &ServerEvent) {
        if senders.is_empty() {
            return;
        }

        let msg = match event.to_msg() {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!("failed to encode {}: {}", event.name(), e);
                return;
            }
        };

        for (id, sender) in senders {
            match sender.try_send(msg.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(conn = %id, "outbound queue full, dropping {}", event.name());
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(conn = %id, "channel closed, dropping {}", event.name());
                }
            }
        }
    }
}

#[async_trait]
impl Transport for ChannelHub {
    async fn join_group(&self, connection_id: &str, group: &str) {
        let mut inner = self.inner.write().await;
        inner
            .groups
            .entry(group.to_owned())
            .or_default()
            .insert(connection_id.to_owned());
    }

    async fn leave_group(&self, connection_id: &str, group: &str) {
        let mut inner = self.inner.write().await;
        inner.leave(connection_id, group);
    }

    async fn send_to_group(&self, group: &str, event: &ServerEvent) {
        let senders = self.inner.read().await.group_senders(group);
        Self::deliver(senders, event);
    }

    async fn send_to_all(&self, event: &ServerEvent) {
        let senders = {
            let inner = self.inner.read().await;
            inner
                .clients
                .iter()
                .map(|(id, tx)| (id.clone(), tx.clone()))
                .collect()
        };
        Self::deliver(senders, event);
    }

    async fn send_to_caller(&self, connection_id: &str, event: &ServerEvent) {
        let sender = self.inner.read().await.clients.get(connection_id).cloned();

        if let Some(sender) = sender {
            Self::deliver(vec![(connection_id.to_owned(), sender)], event);
        }
    }
}
