//! Project registry construction and name resolution.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::backend::{open_with_retry, ConnectionSpec, TileBackend};
use crate::config::ServiceConfig;
use crate::stats::Counters;

use super::Project;

/// Image format assumed when a store carries no format metadata.
const FALLBACK_FORMAT: &str = "png";

/// Name→project lookup for the whole service.
///
/// Canonical names and aliases both resolve through an indirection table to
/// an index into the project list, so an alias and its canonical name reach
/// the identical [`Project`] record. The registry is populated once at
/// startup and never mutated afterwards, which keeps the per-request read
/// path lock-free.
#[derive(Debug)]
pub struct ProjectRegistry<S> {
    projects: Vec<Arc<Project<S>>>,
    names: HashMap<String, usize>,
    aliases: HashSet<String>,
}

impl<S> ProjectRegistry<S> {
    pub fn new() -> Self {
        Self {
            projects: Vec::new(),
            names: HashMap::new(),
            aliases: HashSet::new(),
        }
    }

    /// Register a project under its canonical name, optionally with an alias.
    ///
    /// A later project re-using a canonical name replaces the binding. An
    /// alias that is already taken (by any earlier name) is ignored with a
    /// diagnostic; first registration wins.
    pub fn register(&mut self, project: Project<S>, alias: Option<&str>) {
        let name = project.name().to_string();
        let index = self.projects.len();
        self.projects.push(Arc::new(project));
        self.names.insert(name.clone(), index);

        if let Some(alias) = alias.filter(|a| !a.is_empty()) {
            if self.names.contains_key(alias) {
                warn!("alias '{}' (-> '{}') already exists, skipping", alias, name);
                return;
            }
            self.names.insert(alias.to_string(), index);
            self.aliases.insert(alias.to_string());
        }
    }

    /// Resolve a name (canonical or alias) to its project record.
    pub fn resolve(&self, name: &str) -> Option<&Arc<Project<S>>> {
        self.names.get(name).map(|&index| &self.projects[index])
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.aliases.contains(name)
    }

    /// Projects reachable under their canonical name, in registration order.
    ///
    /// A record whose canonical name was later rebound to another project is
    /// not listed, matching what name resolution can reach.
    pub fn canonical(&self) -> impl Iterator<Item = &Arc<Project<S>>> {
        self.projects
            .iter()
            .enumerate()
            .filter(|(index, project)| self.names.get(project.name()) == Some(index))
            .map(|(_, project)| project)
    }

    /// Canonical project names with their counters, for the exporters.
    pub fn counters(&self) -> impl Iterator<Item = (&str, &Counters)> {
        self.canonical()
            .map(|project| (project.name(), project.counters()))
    }

    pub fn len(&self) -> usize {
        self.canonical().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for ProjectRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Registry Construction
// =============================================================================

impl ProjectRegistry<TileBackend> {
    /// Build the registry from the service configuration.
    ///
    /// Layers without a name or without sources are skipped with a
    /// diagnostic; loading continues for the remaining layers. Opening a
    /// store blocks with retry until it is reachable, so this must complete
    /// before the listener is bound.
    ///
    /// Relative paths (tile files and default tiles) resolve against
    /// `base_dir`, the directory containing the configuration file.
    pub async fn from_config(config: &ServiceConfig, base_dir: &Path) -> Self {
        let mut registry = Self::new();

        for layer in &config.layers {
            let name = match layer.name.as_deref() {
                Some(name) if !name.is_empty() => name,
                _ => {
                    warn!("skipping layer without a name");
                    continue;
                }
            };
            if layer.files.is_empty() {
                warn!("skipping layer '{}' without tileset sources", name);
                continue;
            }

            let mut project = Project::new(name);

            for tileset in &layer.files {
                let Some(filename) = tileset.filename.as_deref() else {
                    warn!("layer '{}': skipping tileset without a connection spec", name);
                    continue;
                };

                if let Some(default_tile_path) = &tileset.default_tile_path {
                    let path = if default_tile_path.is_absolute() {
                        default_tile_path.clone()
                    } else {
                        base_dir.join(default_tile_path)
                    };
                    match std::fs::read(&path) {
                        Ok(tile) => project.set_default_tile(Bytes::from(tile)),
                        Err(error) => warn!(
                            "layer '{}': cannot read default tile {}: {}",
                            name,
                            path.display(),
                            error
                        ),
                    }
                }

                let spec = ConnectionSpec::parse(filename);
                let backend = open_with_retry(&spec, base_dir).await;

                let format = match backend.query_format().await {
                    Some(format) => format,
                    None => {
                        warn!(
                            "missing format metadata in the '{}' layer, assuming '{}'",
                            name, FALLBACK_FORMAT
                        );
                        FALLBACK_FORMAT.to_string()
                    }
                };

                let zoom_levels = tileset.zoom_levels();
                info!(
                    "layer '{}' zooms {}..{} ({}) uses '{}' image tiles",
                    name,
                    zoom_levels.first().copied().unwrap_or(0),
                    zoom_levels.last().copied().unwrap_or(0),
                    spec.describe(base_dir),
                    format
                );

                project.install_source(Arc::new(backend), &format, &zoom_levels);
            }

            registry.register(project, layer.alias.as_deref());
        }

        registry
    }
}

// =============================================================================
// Tests
// =============================================================================
