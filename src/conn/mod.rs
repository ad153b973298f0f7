//! Broadcast transport: fans events out to connections grouped by room

use crate::session::ServerEvent;
use async_trait::async_trait;

mod client;
pub use client::Client;

mod hub;
pub use hub::ChannelHub;

/// Group based pub/sub used by the session coordinator.
///
/// Membership changes take effect before the call returns. Sends are best
/// effort and never wait on slow receivers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn join_group(&self, connection_id: &str, group: &str);
    async fn leave_group(&self, connection_id: &str, group: &str);
    async fn send_to_group(&self, group: &str, event: &ServerEvent);
    async fn send_to_all(&self, event: &ServerEvent);
    async fn send_to_caller(&self, connection_id: &str, event: &ServerEvent);
}
