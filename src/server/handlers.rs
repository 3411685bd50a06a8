//! HTTP request handlers.
//!
//! The tile handler delegates to the resolver, which owns the whole
//! per-request policy; the monitoring handlers render exporter snapshots
//! and are restricted to callers whose source address is one of the host's
//! own addresses. Handlers are infallible at the axum type level: every
//! failure classification is already a response.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::TileStore;
use crate::project::ProjectRegistry;
use crate::stats::{
    munin_average_sizes, munin_config, munin_values, statistics_document, ServiceStats,
};
use crate::tile::TileResolver;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state, passed to all handlers via axum's State.
pub struct AppState<S: TileStore> {
    pub resolver: Arc<TileResolver<S>>,
    pub registry: Arc<ProjectRegistry<S>>,
    pub stats: Arc<ServiceStats>,
    pub local_addrs: Arc<HashSet<IpAddr>>,
}

impl<S: TileStore> AppState<S> {
    pub fn new(
        registry: Arc<ProjectRegistry<S>>,
        stats: Arc<ServiceStats>,
        path_prefix: &str,
        local_addrs: HashSet<IpAddr>,
    ) -> Self {
        let resolver = Arc::new(TileResolver::new(
            Arc::clone(&registry),
            Arc::clone(&stats),
            path_prefix,
        ));
        Self {
            resolver,
            registry,
            stats,
            local_addrs: Arc::new(local_addrs),
        }
    }

    /// Whether the peer address counts as the host itself.
    fn is_local_caller(&self, peer: IpAddr) -> bool {
        let peer = peer.to_canonical();
        peer.is_loopback() || self.local_addrs.contains(&peer)
    }
}

impl<S: TileStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            registry: Arc::clone(&self.registry),
            stats: Arc::clone(&self.stats),
            local_addrs: Arc::clone(&self.local_addrs),
        }
    }
}

// =============================================================================
// Tile Surface
// =============================================================================

/// Serve one tile request; the router's fallback, so every path not claimed
/// by a monitoring route lands here.
pub async fn tile_handler<S: TileStore + 'static>(
    State(state): State<AppState<S>>,
    uri: Uri,
) -> Response {
    let resolved = state.resolver.resolve(uri.path()).await;

    Response::builder()
        .status(resolved.status)
        .header(header::CONTENT_TYPE, resolved.content_type)
        .body(Body::from(resolved.body))
        .unwrap()
}

// =============================================================================
// Monitoring Surface
// =============================================================================

fn not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        format!("Not Found: {}", path),
    )
        .into_response()
}

/// `GET /statistics.json` - the JSON statistics document.
pub async fn statistics_handler<S: TileStore + 'static>(
    State(state): State<AppState<S>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Response {
    if !state.is_local_caller(peer.ip()) {
        return not_found(uri.path());
    }

    Json(statistics_document(&state.stats, state.registry.counters())).into_response()
}

/// `GET /munin` - current counter and moment values.
pub async fn munin_values_handler<S: TileStore + 'static>(
    State(state): State<AppState<S>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Response {
    if !state.is_local_caller(peer.ip()) {
        return not_found(uri.path());
    }

    munin_values(&state.stats, state.registry.counters()).into_response()
}

/// `GET /munin/config` - graph metadata declarations.
pub async fn munin_config_handler<S: TileStore + 'static>(
    State(state): State<AppState<S>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Response {
    if !state.is_local_caller(peer.ip()) {
        return not_found(uri.path());
    }

    let names: Vec<&str> = state.registry.counters().map(|(name, _)| name).collect();
    munin_config(names).into_response()
}

/// `GET /munin/average_size` - running average tile size per project.
pub async fn munin_average_size_handler<S: TileStore + 'static>(
    State(state): State<AppState<S>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
) -> Response {
    if !state.is_local_caller(peer.ip()) {
        return not_found(uri.path());
    }

    munin_average_sizes(state.registry.counters()).into_response()
}
