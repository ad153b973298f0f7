//! Connection and room session management

use crate::core::Error;
use std::{future::Future, time::Duration};

mod coordinator;
mod directory;
mod event;
mod locks;
mod message_log;
mod registry;

pub use coordinator::SessionCoordinator;
pub use directory::RoomDirectory;
pub use event::{ClientEvent, ServerEvent};
pub use locks::KeyedLocks;
pub use message_log::MessageLog;
pub use registry::ConnectionRegistry;

/// Bound a store call, expiry counts as a store failure
async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::StoreTimeout)?
}
