//! PostgreSQL tile store.

use bytes::Bytes;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::error::BackendError;

use super::spec::ConnectionSpec;

/// Tile store backed by a PostgreSQL `tiles` table.
///
/// Two schema generations exist in the wild: newer tables carry a
/// `tile_scale` disambiguator column, older ones do not. Queries try the
/// scaled form first and fall back to the un-scaled form when it yields
/// nothing (including when the column itself is absent).
#[derive(Debug)]
pub struct RelationalStore {
    pool: PgPool,
}

const SCALED_QUERY: &str = "SELECT tile_data FROM tiles \
     WHERE zoom_level = $1 AND tile_column = $2 AND tile_row = $3 AND tile_scale = 1";

const UNSCALED_QUERY: &str = "SELECT tile_data FROM tiles \
     WHERE zoom_level = $1 AND tile_column = $2 AND tile_row = $3";

impl RelationalStore {
    /// Connect to the PostgreSQL store described by `spec`.
    pub async fn open(spec: &ConnectionSpec) -> Result<Self, BackendError> {
        let mut options = PgConnectOptions::new()
            .host(spec.host())
            .port(spec.port())
            .application_name("tilegate");

        if let Some(dbname) = spec.dbname() {
            options = options.database(dbname);
        }
        if let Some(user) = spec.user() {
            options = options.username(user);
        }
        if let Some(password) = spec.password() {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(|e| {
                BackendError::Connect(format!("pg://{}:{}: {}", spec.host(), spec.port(), e))
            })?;

        Ok(Self { pool })
    }

    /// Fetch a tile blob; `Ok(None)` is a clean miss.
    ///
    /// The scaled query runs first; on no row or error (legacy schema
    /// without `tile_scale`) the un-scaled query's result is authoritative.
    pub async fn query_tile(
        &self,
        zoom: u8,
        col: u64,
        row: u64,
    ) -> Result<Option<Bytes>, BackendError> {
        let scaled = sqlx::query_scalar::<_, Vec<u8>>(SCALED_QUERY)
            .bind(zoom as i32)
            .bind(col as i64)
            .bind(row as i64)
            .fetch_optional(&self.pool)
            .await;

        if let Ok(Some(tile)) = scaled {
            return Ok(Some(Bytes::from(tile)));
        }

        sqlx::query_scalar::<_, Vec<u8>>(UNSCALED_QUERY)
            .bind(zoom as i32)
            .bind(col as i64)
            .bind(row as i64)
            .fetch_optional(&self.pool)
            .await
            .map(|tile| tile.map(Bytes::from))
            .map_err(|e| BackendError::Query(e.to_string()))
    }

    /// Image format declared in the store's metadata table, if any.
    pub async fn query_format(&self) -> Option<String> {
        sqlx::query_scalar::<_, String>("SELECT value FROM metadata WHERE name = 'format'")
            .fetch_optional(&self.pool)
            .await
            .ok()
            .flatten()
    }
}
