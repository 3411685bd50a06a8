//! MongoDB tile store.

use bytes::Bytes;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};

use crate::error::BackendError;

use super::spec::ConnectionSpec;

/// Tile store backed by a MongoDB `tiles` collection.
///
/// Tiles are keyed by a composite `_id` string `"{zoom}/{col}/{row}/{scale}"`
/// with the scale fixed at 1, and the blob lives in the `d` field.
#[derive(Debug)]
pub struct DocumentStore {
    tiles: Collection<Document>,
    metadata: Collection<Document>,
}

impl DocumentStore {
    /// Connect to the MongoDB store described by `spec`.
    ///
    /// The driver connects lazily, so reachability is probed with a `ping`
    /// command; an unreachable server fails here, not on the first query.
    pub async fn open(spec: &ConnectionSpec) -> Result<Self, BackendError> {
        let credentials = match (spec.user(), spec.password()) {
            (Some(user), Some(password)) => format!("{}:{}@", user, password),
            _ => String::new(),
        };
        let uri = format!(
            "mongodb://{}{}:{}/admin",
            credentials,
            spec.host(),
            spec.port()
        );

        let client = Client::with_uri_str(&uri)
            .await
            .map_err(|e| BackendError::InvalidSpec(e.to_string()))?;

        let database = client.database(spec.dbname().unwrap_or("tiles"));
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                BackendError::Connect(format!(
                    "mongodb://{}:{}: {}",
                    spec.host(),
                    spec.port(),
                    e
                ))
            })?;

        Ok(Self {
            tiles: database.collection("tiles"),
            metadata: database.collection("metadata"),
        })
    }

    /// Fetch a tile blob; `Ok(None)` is a clean miss.
    pub async fn query_tile(
        &self,
        zoom: u8,
        col: u64,
        row: u64,
    ) -> Result<Option<Bytes>, BackendError> {
        let tile_id = format!("{}/{}/{}/{}", zoom, col, row, 1);

        let result = self
            .tiles
            .find_one(doc! { "_id": tile_id })
            .await
            .map_err(|e| BackendError::Query(e.to_string()))?;

        // A document without a binary blob is treated as a miss.
        Ok(result.and_then(|tile| match tile.get("d") {
            Some(Bson::Binary(binary)) => Some(Bytes::from(binary.bytes.clone())),
            _ => None,
        }))
    }

    /// Image format declared in the store's metadata collection, if any.
    pub async fn query_format(&self) -> Option<String> {
        self.metadata
            .find_one(doc! { "name": "format" })
            .await
            .ok()
            .flatten()
            .and_then(|entry| entry.get_str("value").ok().map(str::to_string))
    }
}
