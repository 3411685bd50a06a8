//! # tilegate
//!
//! A gateway for serving pre-rendered map tiles out of heterogeneous tile
//! stores: embedded MBTiles files (SQLite), PostgreSQL, or MongoDB.
//!
//! The service answers requests of the shape
//! `GET /{project}/{zoom}/{col}/{row}.{format}` by looking up the backend
//! configured for that project and zoom level, fetching the tile blob, and
//! falling back to a per-project default image when the store has no tile.
//! Every request moves per-project and global counters, and successful
//! requests feed streaming latency moment accumulators
//! (mean/variance/skewness/kurtosis) exposed over a monitoring surface.
//!
//! ## Architecture
//!
//! - [`backend`] - Tile store adapters (MBTiles, PostgreSQL, MongoDB) behind
//!   the [`backend::TileStore`] seam
//! - [`project`] - Project registry with alias indirection, built once at
//!   startup from the configuration
//! - [`tile`] - Path parsing, the TMS/XYZ row flip, and the per-request
//!   tile resolver
//! - [`stats`] - Counters, streaming latency moments, and the monitoring
//!   exporters (JSON document and munin text protocol)
//! - [`server`] - Axum-based HTTP server and routes
//! - [`logrotate`] - Companion housekeeping for rotated log files
//! - [`config`] - CLI and configuration types

pub mod backend;
pub mod config;
pub mod error;
pub mod logrotate;
pub mod project;
pub mod server;
pub mod stats;
pub mod tile;

// Re-export commonly used types
pub use backend::{
    open_with_retry, ConnectionSpec, Driver, TileBackend, TileStore, OPEN_RETRY_DELAY,
};
pub use config::{Cli, Command, LayerConfig, ServiceConfig, TilesetConfig};
pub use error::{BackendError, ConfigError};
pub use project::{Project, ProjectRegistry};
pub use server::{create_router, local_address_set, AppState};
pub use stats::{
    munin_average_sizes, munin_config, munin_values, statistics_document, Counters,
    RequestMoments, RequestOutcome, ServiceStats, StatsDocument,
};
pub use tile::{flip_row, mime_type, parse_path, ResolvedTile, TilePath, TileResolver};
