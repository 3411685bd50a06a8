//! Router-level tests for the monitoring surface.

use axum::http::StatusCode;
use http_body_util::BodyExt;
use tower::ServiceExt;

use tilegate::ProjectRegistry;

use super::test_utils::{
    local_request, project, request_from, service, MockTileStore,
};

// =============================================================================
// Access Restriction
// =============================================================================

#[tokio::test]
async fn test_monitoring_routes_reject_remote_callers() {
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", MockTileStore::new(), "png", None), None);
    let service = service(registry);

    for uri in [
        "/statistics.json",
        "/munin",
        "/munin/config",
        "/munin/average_size",
    ] {
        let response = service
            .router
            .clone()
            .oneshot(request_from(uri, [203, 0, 113, 9]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri {uri}");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text, format!("Not Found: {uri}"));
    }

    // Monitoring rejections never move the request counters.
    assert_eq!(service.stats.requests(), 0);
}

#[tokio::test]
async fn test_monitoring_routes_allow_local_callers() {
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", MockTileStore::new(), "png", None), None);
    let service = service(registry);

    for uri in [
        "/statistics.json",
        "/munin",
        "/munin/config",
        "/munin/average_size",
    ] {
        let response = service
            .router
            .clone()
            .oneshot(local_request(uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri {uri}");
    }
}

// =============================================================================
// JSON Statistics
// =============================================================================

#[tokio::test]
async fn test_statistics_document_reflects_traffic() {
    let store = MockTileStore::new().with_tile(1, 0, 1, b"tile-data");
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", store, "png", None), Some("openstreetmap"));
    let service = service(registry);

    // One hit, one project miss, one unknown project.
    for uri in ["/osm/1/0/0.png", "/osm/1/1/1.png", "/nope/1/0/0.png"] {
        service
            .router
            .clone()
            .oneshot(local_request(uri))
            .await
            .unwrap();
    }

    let response = service
        .router
        .clone()
        .oneshot(local_request("/statistics.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let document: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(document["host"], "testhost");
    assert_eq!(document["requests"]["requests"], 3);
    assert_eq!(document["requests"]["success"], 1);
    assert_eq!(document["requests"]["fail"], 2);

    assert_eq!(document["projects"]["osm"]["requests"]["requests"], 2);
    assert_eq!(document["projects"]["osm"]["requests"]["success"], 1);
    assert_eq!(document["projects"]["osm"]["requests"]["fail"], 1);

    // Aliases are not listed as separate projects.
    assert!(document["projects"]["openstreetmap"].is_null());

    // A single latency sample: stddev/skewness are undefined, exported as 0.
    assert_eq!(document["projects"]["osm"]["request_time"]["stddev"], 0.0);
    assert_eq!(document["projects"]["osm"]["request_time"]["skewness"], 0.0);
}

// =============================================================================
// Munin Protocol
// =============================================================================

#[tokio::test]
async fn test_munin_config_declares_project_graphs() {
    let mut registry = ProjectRegistry::new();
    registry.register(
        project("osm", MockTileStore::new(), "png", None),
        Some("openstreetmap"),
    );
    let service = service(registry);

    let response = service
        .router
        .clone()
        .oneshot(local_request("/munin/config"))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("multigraph tilegate_requests\n"));
    assert!(text.contains("multigraph tilegate_requests_osm\n"));
    assert!(text.contains("multigraph tilegate_request_time_osm\n"));
    assert!(text.contains("multigraph tilegate_uptime\n"));
    assert!(text.contains("osm_requests.type DERIVE\n"));

    // The alias gets no graphs of its own.
    assert!(!text.contains("openstreetmap"));
}

#[tokio::test]
async fn test_munin_values_reflect_counters() {
    let store = MockTileStore::new().with_tile(1, 0, 1, b"tile-data");
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", store, "png", None), None);
    let service = service(registry);

    service
        .router
        .clone()
        .oneshot(local_request("/osm/1/0/0.png"))
        .await
        .unwrap();

    let response = service
        .router
        .clone()
        .oneshot(local_request("/munin"))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("requests.value 1\n"));
    assert!(text.contains("success.value 1\n"));
    assert!(text.contains("fail.value 0\n"));
    assert!(text.contains("osm_requests.value 1\n"));
    assert!(text.contains("multigraph tilegate_uptime\n"));
    assert!(!text.contains("NaN"));
}

#[tokio::test]
async fn test_munin_average_size_lines() {
    let store = MockTileStore::new().with_tile(1, 0, 1, b"0123456789");
    let mut registry = ProjectRegistry::new();
    registry.register(project("osm", store, "png", None), None);
    registry.register(project("idle", MockTileStore::new(), "png", None), None);
    let service = service(registry);

    service
        .router
        .clone()
        .oneshot(local_request("/osm/1/0/0.png"))
        .await
        .unwrap();

    let response = service
        .router
        .clone()
        .oneshot(local_request("/munin/average_size"))
        .await
        .unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains("osm_average_size.value 10\n"));
    assert!(text.contains("idle_average_size.value 0\n"));
}
