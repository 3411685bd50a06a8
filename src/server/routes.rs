//! Router construction.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::backend::TileStore;
use crate::tile::normalize_prefix;

use super::handlers::{
    munin_average_size_handler, munin_config_handler, munin_values_handler, statistics_handler,
    tile_handler, AppState,
};

/// Build the application router.
///
/// Monitoring routes are mounted under `path_prefix` alongside the tile
/// surface; everything not claimed by them falls through to tile
/// resolution, which turns unparseable paths into the plain-text 404.
pub fn create_router<S: TileStore + 'static>(
    state: AppState<S>,
    path_prefix: &str,
    enable_tracing: bool,
) -> Router {
    let prefix = normalize_prefix(path_prefix);

    let router = Router::new()
        .route(
            &format!("{}/statistics.json", prefix),
            get(statistics_handler::<S>),
        )
        .route(&format!("{}/munin", prefix), get(munin_values_handler::<S>))
        .route(
            &format!("{}/munin/config", prefix),
            get(munin_config_handler::<S>),
        )
        .route(
            &format!("{}/munin/average_size", prefix),
            get(munin_average_size_handler::<S>),
        )
        .fallback(tile_handler::<S>)
        .with_state(state);

    if enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}
