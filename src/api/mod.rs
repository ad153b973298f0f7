mod extractor;
mod rooms;
mod router;
mod websocket;

pub use router::make_app;

use crate::{
    conn::ChannelHub,
    core::Error,
    session::SessionCoordinator,
    store::{MemoryStore, PgStore, Store},
    util::{config::Config, password::AdminPassword},
};
use std::sync::Arc;

// ========================// AppState //======================== //

/// State shared by every handler
pub struct AppState {
    pub config: Config,
    pub hub: Arc<ChannelHub>,
    pub coordinator: Arc<SessionCoordinator>,
}

impl AppState {
    /// Connect the store and prepare it for serving
    pub async fn new(config: Config) -> Result<Arc<Self>, Error> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => Arc::new(PgStore::new(url).await?),
            None => {
                tracing::warn!("DATABASE_URL is not set, state is kept in memory only");
                Arc::new(MemoryStore::new())
            }
        };

        let hub = Arc::new(ChannelHub::new());
        let verifier = Arc::new(AdminPassword::new(config.admin_password_hash.clone()));
        if config.admin_password_hash.is_none() {
            tracing::warn!("ADMIN_PASSWORD_HASH is not set, clearing history is disabled");
        }

        let coordinator = Arc::new(SessionCoordinator::new(
            &config,
            store,
            hub.clone(),
            verifier,
        ));
        coordinator.init().await?;

        Ok(Arc::new(Self {
            config,
            hub,
            coordinator,
        }))
    }
}
