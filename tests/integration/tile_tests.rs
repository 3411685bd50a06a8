//! Router-level tests for the tile surface.

use axum::http::StatusCode;
use http_body_util::BodyExt;
use tower::ServiceExt;

use tilegate::ProjectRegistry;

use super::test_utils::{local_request, project, service, service_with_prefix, MockTileStore};

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    // Requested row 5 at zoom 3 flips to stored row 2 (TMS convention).
    let store = MockTileStore::new().with_tile(3, 2, 2, b"tile-bytes");
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", store, "png", None), None);
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/osm/3/2/5.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"tile-bytes");

    assert_eq!(service.counters("osm").requests(), 1);
    assert_eq!(service.counters("osm").success(), 1);
    assert_eq!(service.stats.success(), 1);
    assert_eq!(service.counters("osm").average_size(), Some(10));
}

#[tokio::test]
async fn test_jpg_content_type() {
    let store = MockTileStore::new().with_tile(0, 0, 0, b"jpeg-bytes");
    let mut registry = ProjectRegistry::new();
    registry.register(project("photo", store, "jpg", None), None);
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/photo/0/0/0.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
}

// =============================================================================
// Fallback Policy
// =============================================================================

#[tokio::test]
async fn test_miss_serves_default_tile_as_png() {
    // Store is empty: every lookup is a clean miss.
    let mut registry = ProjectRegistry::new();
    registry.register(
        project("osm", MockTileStore::new(), "jpg", Some(b"default-tile")),
        None,
    );
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/osm/2/1/1.jpg"))
        .await
        .unwrap();

    // Served as png regardless of the requested format.
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"default-tile");

    assert_eq!(service.counters("osm").success(), 1);
}

#[tokio::test]
async fn test_miss_without_default_tile_is_404() {
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", MockTileStore::new(), "png", None), None);
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/osm/2/1/1.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"Not Found: /osm/2/1/1.png");

    assert_eq!(service.counters("osm").requests(), 1);
    assert_eq!(service.counters("osm").fail(), 1);
}

#[tokio::test]
async fn test_backend_error_is_404_even_with_default_tile() {
    let mut registry = ProjectRegistry::new();
    registry.register(
        project("osm", MockTileStore::failing(), "png", Some(b"default-tile")),
        None,
    );
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/osm/2/1/1.png"))
        .await
        .unwrap();

    // A hard backend failure never falls back to the default tile.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(service.counters("osm").fail(), 1);
    assert_eq!(service.stats.fail(), 1);
    assert_eq!(service.stats.latency().num_samples(), 0);
}

#[tokio::test]
async fn test_format_mismatch_skips_backend_and_falls_back() {
    // The failing store proves the backend is never queried on a format
    // mismatch; the request falls through to the default tile.
    let mut registry = ProjectRegistry::new();
    registry.register(
        project("osm", MockTileStore::failing(), "png", Some(b"default-tile")),
        None,
    );
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/osm/2/1/1.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(service.counters("osm").success(), 1);
}

// =============================================================================
// Failure Classification
// =============================================================================

#[tokio::test]
async fn test_unknown_project_moves_global_counters_only() {
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", MockTileStore::new(), "png", None), None);
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/atlantis/1/0/0.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"Not Found: /atlantis/1/0/0.png");

    assert_eq!(service.stats.requests(), 1);
    assert_eq!(service.stats.fail(), 1);
    assert_eq!(service.counters("osm").requests(), 0);
}

#[tokio::test]
async fn test_unparseable_path_is_404() {
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", MockTileStore::new(), "png", None), None);
    let service = service(registry);

    for uri in ["/osm/one/0/0.png", "/osm/1/0/0", "/osm", "/"] {
        let response = service
            .router
            .clone()
            .oneshot(local_request(uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");
    }

    assert_eq!(service.stats.requests(), 4);
    assert_eq!(service.stats.fail(), 4);
    assert_eq!(service.counters("osm").requests(), 0);
}

#[tokio::test]
async fn test_row_past_grid_fails_for_project() {
    let mut registry = ProjectRegistry::new();
    registry.register(
        project("osm", MockTileStore::new(), "png", Some(b"default-tile")),
        None,
    );
    let service = service(registry);

    // Row 9 at zoom 1 flips negative: seen by the project, then rejected.
    let response = service
        .router
        .clone()
        .oneshot(local_request("/osm/1/0/9.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(service.counters("osm").requests(), 1);
    assert_eq!(service.counters("osm").fail(), 1);
}

// =============================================================================
// Aliases
// =============================================================================

#[tokio::test]
async fn test_alias_shares_the_canonical_counters() {
    let store = MockTileStore::new().with_tile(1, 0, 1, b"tile");
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", store, "png", None), Some("openstreetmap"));
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/openstreetmap/1/0/0.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // One record: the success through the alias is visible on "osm".
    assert_eq!(service.counters("osm").requests(), 1);
    assert_eq!(service.counters("osm").success(), 1);
    assert_eq!(service.counters("openstreetmap").success(), 1);
}

#[tokio::test]
async fn test_duplicate_alias_keeps_first_binding() {
    let osm_store = MockTileStore::new().with_tile(1, 0, 1, b"osm-tile");
    let topo_store = MockTileStore::new().with_tile(1, 0, 1, b"topo-tile");

    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", osm_store, "png", None), Some("maps"));
    registry.register(project("topo", topo_store, "png", None), Some("maps"));
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/maps/1/0/0.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"osm-tile");

    // The contested alias moved only the first claimant's counters.
    assert_eq!(service.counters("osm").requests(), 1);
    assert_eq!(service.counters("topo").requests(), 0);
}

// =============================================================================
// Path Prefix
// =============================================================================

#[tokio::test]
async fn test_path_prefix_mounts_the_tile_surface() {
    let store = MockTileStore::new().with_tile(1, 0, 1, b"tile");
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", store, "png", None), None);
    let service = service_with_prefix(registry, "/tiles");

    let response = service
        .router
        .clone()
        .oneshot(local_request("/tiles/osm/1/0/0.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Outside the prefix nothing resolves; the 404 echoes the full path.
    let response = service
        .router
        .clone()
        .oneshot(local_request("/osm/1/0/0.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), b"Not Found: /osm/1/0/0.png");
}
