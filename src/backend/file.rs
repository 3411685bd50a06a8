//! Embedded MBTiles (SQLite) tile store.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::BackendError;

/// Tile store backed by a local MBTiles file.
///
/// The pool provides the per-worker connection discipline for concurrent
/// requests; the file itself is never written to.
#[derive(Debug)]
pub struct FileStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl FileStore {
    /// Open an MBTiles file.
    ///
    /// The file must already exist. Cache sizing and in-memory temp storage
    /// pragmas are applied to every connection; these are fixed tuning, not
    /// user-exposed configuration.
    pub async fn open(path: &Path) -> Result<Self, BackendError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .pragma("cache_size", "20000")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| BackendError::Connect(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Fetch a tile blob; `Ok(None)` is a clean miss.
    pub async fn query_tile(
        &self,
        zoom: u8,
        col: u64,
        row: u64,
    ) -> Result<Option<Bytes>, BackendError> {
        sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT tile_data FROM tiles WHERE zoom_level = ? AND tile_column = ? AND tile_row = ?",
        )
        .bind(zoom as i64)
        .bind(col as i64)
        .bind(row as i64)
        .fetch_optional(&self.pool)
        .await
        .map(|tile| tile.map(Bytes::from))
        .map_err(|e| BackendError::Query(e.to_string()))
    }

    /// Image format declared in the MBTiles metadata table, if any.
    pub async fn query_format(&self) -> Option<String> {
        sqlx::query_scalar::<_, String>("SELECT value FROM metadata WHERE name = 'format'")
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
