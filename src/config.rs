//! Configuration management for tilegate.
//!
//! Two layers of configuration exist:
//!
//! - The command line (via clap), which selects a subcommand and points at
//!   the configuration file.
//! - The configuration file itself, a JSON document describing the listen
//!   address, log destination and the tile layers to serve.
//!
//! # Configuration File
//!
//! ```json
//! {
//!   "port": 3000,
//!   "hostname": "127.0.0.1",
//!   "logfile": "console",
//!   "path_prefix": "",
//!   "layers": [
//!     { "name": "osm", "alias": "openstreetmap",
//!       "files": [
//!         { "filename": "tiles/osm.mbtiles",
//!           "default_tile_path": "default.png",
//!           "zoom_range": [0, 1, 2, 3, 4, 5, 6] }
//!       ] }
//!   ]
//! }
//! ```
//!
//! Each `filename` is a connection spec: a plain path selects the embedded
//! MBTiles store, `driver=postgres ...` the relational store and
//! `driver=mongodb ...` the document store (see [`crate::backend`]).
//!
//! Relative paths (tile files and default tiles) resolve against the
//! directory containing the configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Deserialize;

use crate::error::ConfigError;

// =============================================================================
// Default Values
// =============================================================================

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tilegate.cfg";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default server bind address.
pub const DEFAULT_HOSTNAME: &str = "127.0.0.1";

/// Log destination used when the configuration does not name one.
pub const DEFAULT_LOGFILE: &str = "console";

/// Zoom levels covered by a tileset source that does not declare a range.
pub const DEFAULT_ZOOM_RANGE: std::ops::RangeInclusive<u8> = 0..=18;

// =============================================================================
// CLI Arguments
// =============================================================================

/// tilegate - A gateway for serving pre-rendered map tiles.
///
/// Serves tiles out of MBTiles files, PostgreSQL or MongoDB tile stores,
/// with per-project fallback tiles and built-in request statistics.
#[derive(Parser, Debug)]
#[command(name = "tilegate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the tile server.
    Serve(ServeArgs),

    /// Validate a configuration file and probe each tile source once.
    Check(CheckArgs),

    /// Delete old rotated log files and compress the remaining ones.
    ExpireLogs(ExpireLogsArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "TILEGATE_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable per-request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "TILEGATE_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct ExpireLogsArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "TILEGATE_CONFIG")]
    pub config: PathBuf,
}

// =============================================================================
// Configuration File Schema
// =============================================================================

/// The parsed configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address to bind the server to.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Log destination: a file path, or `console` / `null` / `/dev/null`.
    #[serde(default = "default_logfile")]
    pub logfile: String,

    /// Prefix under which the tile routes are mounted (empty for the root).
    #[serde(default)]
    pub path_prefix: String,

    /// Tile layers to serve.
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

/// One tile layer: a named project with its tileset sources.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Project name; a layer without one is skipped at startup.
    #[serde(default)]
    pub name: Option<String>,

    /// Optional second name resolving to the same project.
    #[serde(default)]
    pub alias: Option<String>,

    /// Tileset sources backing this layer.
    #[serde(default)]
    pub files: Vec<TilesetConfig>,
}

/// One tileset source within a layer.
#[derive(Debug, Clone, Deserialize)]
pub struct TilesetConfig {
    /// Connection spec; a source without one is skipped.
    #[serde(default)]
    pub filename: Option<String>,

    /// Image served when the store has no tile for a request.
    #[serde(default)]
    pub default_tile_path: Option<PathBuf>,

    /// Zoom levels this source covers; defaults to 0..=18.
    #[serde(default)]
    pub zoom_range: Option<Vec<u8>>,
}

impl ServiceConfig {
    /// Load and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the server bind address as "hostname:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }

    /// Whether the configured log destination is a real file.
    pub fn logs_to_file(&self) -> bool {
        !matches!(self.logfile.as_str(), "console" | "null" | "/dev/null")
    }
}

impl TilesetConfig {
    /// The zoom levels this source covers, applying the 0..=18 default.
    pub fn zoom_levels(&self) -> Vec<u8> {
        match &self.zoom_range {
            Some(range) if !range.is_empty() => range.clone(),
            _ => DEFAULT_ZOOM_RANGE.collect(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_hostname() -> String {
    DEFAULT_HOSTNAME.to_string()
}

fn default_logfile() -> String {
    DEFAULT_LOGFILE.to_string()
}

// =============================================================================
// Tests
// =============================================================================
