//! Defines the router of the server.

use super::{extractor::gatekeeper, rooms, websocket, AppState};
use crate::{core::Error, util::config::Config};
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

/// Create router of the application.
///
/// - `config`: The global configure of the application.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` when an
/// IP allow list is configured.
pub async fn make_app(config: Config) -> Result<Router, Error> {
    let state = AppState::new(config).await?;

    let guarded = Router::new()
        .merge(websocket::router())
        .merge(rooms::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), gatekeeper));

    let app = Router::new()
        .merge(rooms::health_router())
        .merge(guarded)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}
