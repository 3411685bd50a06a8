//! Projects and the project registry.
//!
//! A [`Project`] is one named tile layer: the zoom→backend and zoom→format
//! mappings installed from its tileset sources, an optional default tile,
//! and its request counters. The [`ProjectRegistry`] maps both canonical
//! names and aliases onto shared project records and is built once at
//! startup; after that it is only ever read.

mod registry;

pub use registry::ProjectRegistry;

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::stats::Counters;

/// One tile layer with its backends, formats, fallback tile and counters.
///
/// A project record is shared (behind `Arc`) between its canonical name and
/// any alias, so counters incremented through either name are observable
/// through the other.
#[derive(Debug)]
pub struct Project<S> {
    name: String,
    backends: HashMap<u8, Arc<S>>,
    formats: HashMap<u8, String>,
    default_tile: Option<Bytes>,
    counters: Counters,
}

impl<S> Project<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backends: HashMap::new(),
            formats: HashMap::new(),
            default_tile: None,
            counters: Counters::new(),
        }
    }

    /// Install one tileset source across the zoom levels it covers.
    ///
    /// The backend handle is shared across the levels; the format discovered
    /// for the source applies uniformly to all of them. A later source
    /// claiming an already-covered zoom replaces the earlier binding.
    pub fn install_source(&mut self, backend: Arc<S>, format: &str, zoom_levels: &[u8]) {
        for &zoom in zoom_levels {
            self.backends.insert(zoom, Arc::clone(&backend));
            self.formats.insert(zoom, format.to_string());
        }
    }

    /// Set the image served when a backend has no tile for a request.
    pub fn set_default_tile(&mut self, tile: Bytes) {
        self.default_tile = Some(tile);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend serving `zoom`, if one is configured.
    pub fn backend(&self, zoom: u8) -> Option<&Arc<S>> {
        self.backends.get(&zoom)
    }

    /// The image format the backend at `zoom` was opened with.
    pub fn format(&self, zoom: u8) -> Option<&str> {
        self.formats.get(&zoom).map(String::as_str)
    }

    pub fn default_tile(&self) -> Option<&Bytes> {
        self.default_tile.as_ref()
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }
}

// =============================================================================
// Tests
// =============================================================================
