//! HTTP API integration tests.
//!
//! Tests verify:
//! - Region bodies and response headers
//! - Pause, resume and flush control endpoints
//! - Cache statistics
//! - HTTP status codes and JSON error bodies

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use block_streamer::{create_router, ImageService, RouterConfig};

use super::test_utils::{config, coord, patterned, solid, CountingFetcher};

const MB: usize = 1024 * 1024;

async fn router_with_blocks() -> Router {
    let fetcher = CountingFetcher::new()
        .with_block(coord(0, 0), solid(7))
        .await
        .with_block(coord(1, 0), patterned(0))
        .await;
    let service = ImageService::new(fetcher, config(0, MB, Duration::from_secs(60))).unwrap();
    create_router(service, RouterConfig::new().with_tracing(false))
}

async fn send(router: &Router, method: &str, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let router = router_with_blocks().await;

    let (status, _, body) = send(&router, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);

    let body = json(&body);
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

// =============================================================================
// Region Retrieval
// =============================================================================

#[tokio::test]
async fn test_region_body_and_headers() {
    let router = router_with_blocks().await;

    let (status, headers, body) = send(&router, "GET", "/region/0/8/4/0?width=16&height=8").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "application/octet-stream");
    assert_eq!(headers.get("cache-control").unwrap(), "public, max-age=60");
    assert_eq!(headers.get("x-region-width").unwrap(), "16");
    assert_eq!(headers.get("x-region-height").unwrap(), "8");
    assert_eq!(headers.get("x-region-bytedepth").unwrap(), "1");

    assert_eq!(body.len(), 16 * 8);
    assert!(body.iter().all(|&b| b == 7));
}

#[tokio::test]
async fn test_region_stitched_across_blocks() {
    let router = router_with_blocks().await;

    let (status, _, body) = send(&router, "GET", "/region/0/24/0/0?width=16&height=2").await;
    assert_eq!(status, StatusCode::OK);

    let right = patterned(0);
    for row in 0..2usize {
        let out = &body[row * 16..row * 16 + 16];
        assert!(out[..8].iter().all(|&b| b == 7));
        assert_eq!(&out[8..], &right[row * 32..row * 32 + 8]);
    }
}

#[tokio::test]
async fn test_region_negative_offset_is_empty_fill() {
    let router = router_with_blocks().await;

    let (status, _, body) = send(&router, "GET", "/region/0/-64/-64/0?width=8&height=8").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, vec![0u8; 64]);
}

#[tokio::test]
async fn test_region_zero_width_is_empty_body() {
    let router = router_with_blocks().await;

    let (status, _, body) = send(&router, "GET", "/region/0/0/0/0?width=0&height=8").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_region_custom_cache_max_age() {
    let service =
        ImageService::new(CountingFetcher::new(), config(0, MB, Duration::from_secs(60))).unwrap();
    let router = create_router(
        service,
        RouterConfig::new()
            .with_cache_max_age(3600)
            .with_tracing(false),
    );

    let (_, headers, _) = send(&router, "GET", "/region/0/0/0/0?width=4&height=4").await;
    assert_eq!(headers.get("cache-control").unwrap(), "public, max-age=3600");
}

#[tokio::test]
async fn test_region_missing_query_is_bad_request() {
    let router = router_with_blocks().await;

    let (status, _, _) = send(&router, "GET", "/region/0/0/0/0?width=16").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&router, "GET", "/region/0/0/0/0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_region_unallocatable_is_insufficient_storage() {
    let router = router_with_blocks().await;

    let (status, _, body) = send(
        &router,
        "GET",
        "/region/0/0/0/0?width=4294967295&height=4294967295",
    )
    .await;
    assert_eq!(status, StatusCode::INSUFFICIENT_STORAGE);
    assert_eq!(json(&body)["error"], "allocation_failed");

    // the service keeps serving
    let (status, _, _) = send(&router, "GET", "/region/0/0/0/0?width=4&height=4").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_region_offset_past_coordinate_space_is_bad_request() {
    let router = router_with_blocks().await;

    let uri = format!("/region/0/{}/0/0?width=2&height=2", i64::MAX);
    let (status, _, body) = send(&router, "GET", &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["error"], "offset_out_of_range");

    let uri = format!("/region/0/0/{}/0?width=2&height=2", i64::MIN);
    let (status, _, body) = send(&router, "GET", &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.len(), 4);
}

#[tokio::test]
async fn test_region_bad_path_is_rejected() {
    let router = router_with_blocks().await;

    let (status, _, _) = send(&router, "GET", "/region/zero/0/0/0?width=4&height=4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&router, "GET", "/region/0/0/0?width=4&height=4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Control Endpoints
// =============================================================================

#[tokio::test]
async fn test_pause_and_resume() {
    let router = router_with_blocks().await;

    let (status, _, body) = send(&router, "POST", "/pause").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["paused"], true);

    let (status, _, body) = send(&router, "GET", "/region/0/0/0/0?width=4&height=4").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body = json(&body);
    assert_eq!(body["error"], "paused");
    assert_eq!(body["status"], 503);

    let (status, _, body) = send(&router, "POST", "/resume").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["paused"], false);

    let (status, _, _) = send(&router, "GET", "/region/0/0/0/0?width=4&height=4").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_control_endpoints_reject_get() {
    let router = router_with_blocks().await;

    let (status, _, _) = send(&router, "GET", "/pause").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_flush_empties_cache() {
    let router = router_with_blocks().await;

    send(&router, "GET", "/region/0/0/0/0?width=64&height=32").await;
    let (_, _, body) = send(&router, "GET", "/cache/stats").await;
    assert_eq!(json(&body)["entries"], 2);

    let (status, _, body) = send(&router, "POST", "/cache/flush").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["cached_blocks"], 0);

    let (_, _, body) = send(&router, "GET", "/cache/stats").await;
    assert_eq!(json(&body)["entries"], 0);
}

#[tokio::test]
async fn test_cache_stats_counts_hits_and_misses() {
    let router = router_with_blocks().await;

    send(&router, "GET", "/region/0/0/0/0?width=32&height=32").await;
    send(&router, "GET", "/region/0/0/0/0?width=32&height=32").await;

    let (status, _, body) = send(&router, "GET", "/cache/stats").await;
    assert_eq!(status, StatusCode::OK);

    let stats = json(&body);
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["resident_bytes"], 1024);
    assert_eq!(stats["capacity_bytes"], MB);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["paused"], false);
}
