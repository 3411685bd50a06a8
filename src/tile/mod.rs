//! Tile request parsing and resolution.
//!
//! [`parse_path`] turns a request path into a [`TilePath`], [`flip_row`]
//! converts the row index between the TMS and XYZ conventions, and
//! [`TileResolver`] orchestrates one request end to end: validate, resolve
//! the project, pick the backend for the zoom level, query, apply the
//! fallback policy and classify the outcome for the statistics engine.

mod path;
mod service;

pub use path::{flip_row, mime_type, normalize_prefix, parse_path, TilePath};
pub use service::{ResolvedTile, TileResolver};
