//! Read-only HTTP handlers

use super::AppState;
use crate::core::Error;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/rooms", get(list_rooms))
}

/// Liveness probe, kept outside the access guards
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

async fn list_rooms(State(state): State<Arc<AppState>>) -> Result<Json<RoomListResponse>, Error> {
    let rooms = state.coordinator.room_names().await?;
    Ok(Json(RoomListResponse { rooms }))
}
