//! Tile store backends.
//!
//! Three store variants sit behind the [`TileBackend`] sum type: an embedded
//! MBTiles file ([`FileStore`]), PostgreSQL ([`RelationalStore`]) and MongoDB
//! ([`DocumentStore`]). Dispatch is by pattern match, so adding a variant is
//! a compile-time-checked change.
//!
//! The [`TileStore`] trait is the seam the tile resolver queries through; it
//! keeps the resolver and registry testable with mock stores. The query
//! contract distinguishes a clean miss (`Ok(None)`) from a backend failure
//! (`Err`); the resolver's fallback policy depends on that distinction.
//!
//! Opening a store can block: [`open_with_retry`] retries forever with a
//! fixed backoff and is only ever called during registry construction,
//! before the service starts accepting requests.

mod document;
mod file;
mod relational;
mod spec;

pub use document::DocumentStore;
pub use file::FileStore;
pub use relational::RelationalStore;
pub use spec::{ConnectionSpec, Driver};

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use crate::error::BackendError;

/// Delay between attempts when a store is not yet reachable at startup.
pub const OPEN_RETRY_DELAY: Duration = Duration::from_secs(5);

// =============================================================================
// TileStore Trait
// =============================================================================

/// Query access to one tile store.
///
/// `Ok(None)` means the store was reachable but holds no such tile; `Err`
/// means the query itself failed. Callers must not treat the two alike.
#[async_trait]
pub trait TileStore: Send + Sync {
    async fn query_tile(&self, zoom: u8, col: u64, row: u64)
        -> Result<Option<Bytes>, BackendError>;
}

// =============================================================================
// TileBackend
// =============================================================================

/// The closed set of production tile store variants.
///
/// A backend is immutable after open (its pool manages its own connection
/// state) and is shared by every request hitting a zoom level mapped to it.
#[derive(Debug)]
pub enum TileBackend {
    File(FileStore),
    Relational(RelationalStore),
    Document(DocumentStore),
}

impl TileBackend {
    /// Open the store a connection spec describes, once, without retry.
    ///
    /// File-store paths resolve relative to `base_dir`.
    pub async fn open(spec: &ConnectionSpec, base_dir: &Path) -> Result<Self, BackendError> {
        match spec.driver() {
            Driver::File => FileStore::open(&spec.resolve_path(base_dir))
                .await
                .map(Self::File),
            Driver::Postgres => RelationalStore::open(spec).await.map(Self::Relational),
            Driver::Mongodb => DocumentStore::open(spec).await.map(Self::Document),
        }
    }

    /// Image format recorded in the store's own metadata, if any.
    pub async fn query_format(&self) -> Option<String> {
        match self {
            Self::File(store) => store.query_format().await,
            Self::Relational(store) => store.query_format().await,
            Self::Document(store) => store.query_format().await,
        }
    }
}

#[async_trait]
impl TileStore for TileBackend {
    async fn query_tile(
        &self,
        zoom: u8,
        col: u64,
        row: u64,
    ) -> Result<Option<Bytes>, BackendError> {
        match self {
            Self::File(store) => store.query_tile(zoom, col, row).await,
            Self::Relational(store) => store.query_tile(zoom, col, row).await,
            Self::Document(store) => store.query_tile(zoom, col, row).await,
        }
    }
}

// =============================================================================
// Startup Retry
// =============================================================================

/// Open a store, retrying forever with a fixed backoff.
///
/// This blocks until the store comes up and is therefore restricted to
/// registry construction, which runs before the listener is bound. Request
/// handling never goes through here.
pub async fn open_with_retry(spec: &ConnectionSpec, base_dir: &Path) -> TileBackend {
    loop {
        match TileBackend::open(spec, base_dir).await {
            Ok(backend) => return backend,
            Err(error) => {
                warn!(
                    source = %spec.describe(base_dir),
                    %error,
                    "tile store not yet ready, retrying in {}s",
                    OPEN_RETRY_DELAY.as_secs()
                );
                tokio::time::sleep(OPEN_RETRY_DELAY).await;
            }
        }
    }
}
