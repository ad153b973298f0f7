//! Defines the access guards run in front of every service.

use super::AppState;
use crate::core::{constant::API_KEY_HEADER, Error};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

/// Extractor used to check the `XApiKey` header against the configured key.
pub struct ApiKeyGuard;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ApiKeyGuard {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .map(|v| v.to_str().unwrap_or_default());

        check_api_key(state.config.api_key.as_deref(), provided)?;
        Ok(ApiKeyGuard)
    }
}

/// Extractor used to check the peer address against the allow list.
///
/// Needs the server to be started with connect info.
pub struct IpGuard;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for IpGuard {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        check_ip(&state.config.ip_allow_list, ip)?;
        Ok(IpGuard)
    }
}

/// Middleware rejecting requests that fail either guard
pub async fn gatekeeper(
    _api_key: ApiKeyGuard,
    _ip: IpGuard,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

fn check_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), Error> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match provided {
        None => Err(Error::MissingApiKey),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(Error::InvalidApiKey),
    }
}

fn check_ip(allowed: &[IpAddr], ip: Option<IpAddr>) -> Result<(), Error> {
    if allowed.is_empty() {
        return Ok(());
    }

    match ip {
        Some(ip) if allowed.contains(&ip) => Ok(()),
        Some(ip) => {
            tracing::warn!("rejected request from {}", ip);
            Err(Error::Forbidden)
        }
        None => Err(Error::Forbidden),
    }
}
