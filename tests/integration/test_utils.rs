//! Shared helpers for the integration tests.

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use bytes::Bytes;

use tilegate::{
    create_router, AppState, BackendError, Counters, Project, ProjectRegistry, ServiceStats,
    TileStore,
};

/// In-memory tile store for router tests.
pub struct MockTileStore {
    tiles: HashMap<(u8, u64, u64), Bytes>,
    fail: bool,
}

impl MockTileStore {
    pub fn new() -> Self {
        Self {
            tiles: HashMap::new(),
            fail: false,
        }
    }

    /// A store whose every query fails, as if the database went away.
    pub fn failing() -> Self {
        Self {
            tiles: HashMap::new(),
            fail: true,
        }
    }

    pub fn with_tile(mut self, zoom: u8, col: u64, row: u64, data: &'static [u8]) -> Self {
        self.tiles.insert((zoom, col, row), Bytes::from_static(data));
        self
    }
}

#[async_trait]
impl TileStore for MockTileStore {
    async fn query_tile(
        &self,
        zoom: u8,
        col: u64,
        row: u64,
    ) -> Result<Option<Bytes>, BackendError> {
        if self.fail {
            return Err(BackendError::Query("mock store unavailable".to_string()));
        }
        Ok(self.tiles.get(&(zoom, col, row)).cloned())
    }
}

/// A project serving `format` tiles from `store` on zoom levels 0..=3.
pub fn project(
    name: &str,
    store: MockTileStore,
    format: &str,
    default_tile: Option<&'static [u8]>,
) -> Project<MockTileStore> {
    let mut project = Project::new(name);
    project.install_source(Arc::new(store), format, &[0, 1, 2, 3]);
    if let Some(tile) = default_tile {
        project.set_default_tile(Bytes::from_static(tile));
    }
    project
}

/// Everything the tests need to poke at after driving the router.
pub struct TestService {
    pub router: axum::Router,
    pub registry: Arc<ProjectRegistry<MockTileStore>>,
    pub stats: Arc<ServiceStats>,
}

impl TestService {
    pub fn counters(&self, name: &str) -> &Counters {
        self.registry.resolve(name).unwrap().counters()
    }
}

/// Build a router over the given registry, with no path prefix.
pub fn service(registry: ProjectRegistry<MockTileStore>) -> TestService {
    service_with_prefix(registry, "")
}

pub fn service_with_prefix(
    registry: ProjectRegistry<MockTileStore>,
    path_prefix: &str,
) -> TestService {
    let registry = Arc::new(registry);
    let stats = Arc::new(ServiceStats::with_hostname("testhost".to_string()));

    let local_addrs: HashSet<IpAddr> = [IpAddr::from([127, 0, 0, 1])].into_iter().collect();
    let state = AppState::new(
        Arc::clone(&registry),
        Arc::clone(&stats),
        path_prefix,
        local_addrs,
    );
    let router = create_router(state, path_prefix, false);

    TestService {
        router,
        registry,
        stats,
    }
}

/// A GET request carrying the given peer address, as the server's
/// connect-info layer would.
pub fn request_from(uri: &str, peer: [u8; 4]) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let addr = SocketAddr::from((IpAddr::from(peer), 54_321));
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

/// A GET request from the host itself.
pub fn local_request(uri: &str) -> Request<Body> {
    request_from(uri, [127, 0, 0, 1])
}
