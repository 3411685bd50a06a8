//! Per-request tile resolution.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::StatusCode;
use tracing::warn;

use crate::backend::TileStore;
use crate::project::{Project, ProjectRegistry};
use crate::stats::{Counters, RequestOutcome, ServiceStats};

use super::path::{flip_row, mime_type, normalize_prefix, parse_path};

/// Format forced onto responses served from a project's default tile.
const DEFAULT_TILE_FORMAT: &str = "png";

// =============================================================================
// Resolved Response
// =============================================================================

/// The transport-agnostic result of resolving one tile request.
#[derive(Debug, Clone)]
pub struct ResolvedTile {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
}

impl ResolvedTile {
    fn tile(format: &str, body: Bytes) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: mime_type(format),
            body,
        }
    }

    fn not_found(path: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            content_type: "text/plain",
            body: Bytes::from(format!("Not Found: {}", path)),
        }
    }
}

// =============================================================================
// Tile Resolver
// =============================================================================

/// Stateless per-request orchestration: parse, resolve the project, query
/// the backend for the zoom level, apply the fallback policy, classify the
/// outcome and move the counters.
///
/// Every path through [`TileResolver::resolve`] terminates in a response;
/// no failure escapes to the transport layer as an error.
pub struct TileResolver<S: TileStore> {
    registry: Arc<ProjectRegistry<S>>,
    stats: Arc<ServiceStats>,
    path_prefix: String,
}

impl<S: TileStore> TileResolver<S> {
    pub fn new(
        registry: Arc<ProjectRegistry<S>>,
        stats: Arc<ServiceStats>,
        path_prefix: &str,
    ) -> Self {
        Self {
            registry,
            stats,
            path_prefix: normalize_prefix(path_prefix),
        }
    }

    /// Resolve one request path to a response.
    ///
    /// Counters always move exactly once per call: global counters on every
    /// request, the project's counters as soon as the name resolved, and
    /// the latency accumulators on success only.
    pub async fn resolve(&self, path: &str) -> ResolvedTile {
        let started = Instant::now();

        let tile_path = match self.strip_prefix(path).and_then(parse_path) {
            Some(tile_path) => tile_path,
            None => return self.fail(None, path, started),
        };

        // TMS -> XYZ, before any bound check.
        let row = flip_row(tile_path.zoom, tile_path.row);

        let project = match self.registry.resolve(&tile_path.project) {
            Some(project) => Arc::clone(project),
            None => return self.fail(None, path, started),
        };

        if tile_path.zoom < 0 || tile_path.col < 0 || row < 0 {
            return self.fail(Some(project.counters()), path, started);
        }

        let mut served: Option<(Bytes, &str)> = None;

        // Never query a backend whose discovered format differs from the
        // request; an unconfigured zoom and a format mismatch are both
        // treated as a miss.
        if let Some((backend, zoom)) = configured_backend(&project, tile_path.zoom, &tile_path.format)
        {
            match backend.query_tile(zoom, tile_path.col as u64, row as u64).await {
                Ok(Some(tile)) => served = Some((tile, tile_path.format.as_str())),
                Ok(None) => {}
                Err(error) => {
                    // A backend failure is a hard fail; the fallback tile is
                    // reserved for clean misses.
                    warn!(project = %tile_path.project, zoom, %error, "backend query failed");
                    return self.fail(Some(project.counters()), path, started);
                }
            }
        }

        if served.is_none() {
            served = project
                .default_tile()
                .map(|tile| (tile.clone(), DEFAULT_TILE_FORMAT));
        }

        let Some((body, format)) = served else {
            return self.fail(Some(project.counters()), path, started);
        };

        self.stats.record(
            Some(project.counters()),
            RequestOutcome::Success,
            elapsed_ms(started),
            body.len() as u64,
        );
        ResolvedTile::tile(format, body)
    }

    /// Strip the configured path prefix; a path outside it cannot parse.
    fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.path_prefix.is_empty() {
            Some(path)
        } else {
            path.strip_prefix(&self.path_prefix)
        }
    }

    fn fail(&self, counters: Option<&Counters>, path: &str, started: Instant) -> ResolvedTile {
        self.stats
            .record(counters, RequestOutcome::Fail, elapsed_ms(started), 0);
        ResolvedTile::not_found(path)
    }
}

/// The backend configured for this zoom, provided its format matches.
fn configured_backend<'a, S>(
    project: &'a Project<S>,
    zoom: i64,
    requested_format: &str,
) -> Option<(&'a Arc<S>, u8)> {
    let zoom = u8::try_from(zoom).ok()?;
    let backend = project.backend(zoom)?;
    (project.format(zoom) == Some(requested_format)).then_some((backend, zoom))
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

// =============================================================================
// Tests
// =============================================================================
