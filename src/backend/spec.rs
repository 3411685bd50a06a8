//! Connection spec parsing.
//!
//! A tileset's `filename` field is a connection spec: space-separated
//! `key=value` tokens with a `driver` key selecting the store variant.
//! A spec without a recognized `driver` is interpreted as a local file path.
//!
//! ```text
//! tiles/osm.mbtiles
//! driver=postgres host=db.internal dbname=tiles user=tiles password=secret
//! driver=mongodb dbname=tiles
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Which store variant a connection spec selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// Embedded MBTiles (SQLite) file.
    File,
    /// PostgreSQL tile store.
    Postgres,
    /// MongoDB tile store.
    Mongodb,
}

/// A parsed connection spec.
#[derive(Debug, Clone)]
pub struct ConnectionSpec {
    driver: Driver,
    raw: String,
    options: HashMap<String, String>,
}

impl ConnectionSpec {
    /// Parse a connection spec string.
    ///
    /// Parsing never fails: anything that does not declare `driver=postgres`
    /// or `driver=mongodb` is a file path.
    pub fn parse(raw: &str) -> Self {
        let options: HashMap<String, String> = raw
            .split_whitespace()
            .filter_map(|token| token.split_once('='))
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        let driver = match options.get("driver").map(String::as_str) {
            Some("postgres") => Driver::Postgres,
            Some("mongodb") => Driver::Mongodb,
            _ => Driver::File,
        };

        Self {
            driver,
            raw: raw.to_string(),
            options,
        }
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// The raw spec string (the file path for the file store).
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Resolve the file-store path, relative paths against `base_dir`.
    pub fn resolve_path(&self, base_dir: &Path) -> PathBuf {
        let path = Path::new(self.raw.trim());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Host for a networked store, defaulting to the local machine.
    pub fn host(&self) -> &str {
        self.options.get("host").map(String::as_str).unwrap_or("127.0.0.1")
    }

    /// Port for a networked store, with the variant's conventional default.
    pub fn port(&self) -> u16 {
        let default = match self.driver {
            Driver::Postgres => 5432,
            Driver::Mongodb => 27017,
            Driver::File => 0,
        };
        self.options
            .get("port")
            .and_then(|port| port.parse().ok())
            .unwrap_or(default)
    }

    pub fn dbname(&self) -> Option<&str> {
        self.options.get("dbname").map(String::as_str)
    }

    pub fn user(&self) -> Option<&str> {
        self.options.get("user").map(String::as_str)
    }

    pub fn password(&self) -> Option<&str> {
        self.options.get("password").map(String::as_str)
    }

    /// Short description for startup logging, without credentials.
    pub fn describe(&self, base_dir: &Path) -> String {
        match self.driver {
            Driver::File => self.resolve_path(base_dir).display().to_string(),
            Driver::Postgres => format!(
                "pg://{}:{}/{}",
                self.host(),
                self.port(),
                self.dbname().unwrap_or("")
            ),
            Driver::Mongodb => format!(
                "mongodb://{}:{}/{}",
                self.host(),
                self.port(),
                self.dbname().unwrap_or("")
            ),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
