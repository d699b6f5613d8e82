//! HTTP request handlers for the Block Streamer region API.
//!
//! # Endpoints
//!
//! - `GET /region/{zoom}/{x}/{y}/{z}?width=W&height=H` - Serve a raw region
//! - `GET /cache/stats` - Block cache counters
//! - `POST /cache/flush` - Drop every cached block
//! - `POST /pause`, `POST /resume` - Stop / restart serving regions
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::block::{Offset, Region};
use crate::error::{ComposeError, FetchError, ServiceError};
use crate::fetch::BlockFetcher;
use crate::service::ImageService;

const X_REGION_WIDTH: HeaderName = HeaderName::from_static("x-region-width");
const X_REGION_HEIGHT: HeaderName = HeaderName::from_static("x-region-height");
const X_REGION_BYTEDEPTH: HeaderName = HeaderName::from_static("x-region-bytedepth");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the image service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<F: BlockFetcher> {
    /// The image service for processing region requests
    pub image_service: Arc<ImageService<F>>,

    /// Cache-Control max-age in seconds for region responses
    pub cache_max_age: u32,
}

impl<F: BlockFetcher> AppState<F> {
    /// Create a new application state with the given image service.
    pub fn new(image_service: ImageService<F>) -> Self {
        Self::with_cache_max_age(image_service, 60)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(image_service: ImageService<F>, cache_max_age: u32) -> Self {
        Self {
            image_service: Arc::new(image_service),
            cache_max_age,
        }
    }
}

impl<F: BlockFetcher> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            image_service: Arc::clone(&self.image_service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for region requests.
///
/// Extracted from: `/region/{zoom}/{x}/{y}/{z}`
#[derive(Debug, Deserialize)]
pub struct RegionPathParams {
    pub zoom: u32,
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

/// Query parameters for region requests.
#[derive(Debug, Deserialize)]
pub struct RegionQueryParams {
    /// Region width in pixels
    pub width: u32,

    /// Region height in pixels
    pub height: u32,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "paused", "fetch_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

/// Block cache counters plus the pause state.
#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub entries: usize,
    pub resident_bytes: usize,
    pub capacity_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub paused: bool,
}

/// Response for control endpoints (flush, pause, resume).
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub paused: bool,
    pub cached_blocks: usize,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert ServiceError to HTTP response.
///
/// 4xx errors are logged at WARN level, 503 while paused at DEBUG, and 5xx at
/// ERROR level.
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ServiceError::Paused => (StatusCode::SERVICE_UNAVAILABLE, "paused"),
            ServiceError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            ServiceError::Fetch(FetchError::Unreachable(_)) => {
                (StatusCode::BAD_GATEWAY, "upstream_unreachable")
            }
            ServiceError::Fetch(FetchError::InvalidRegion(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_region")
            }
            ServiceError::Fetch(_) => (StatusCode::BAD_GATEWAY, "fetch_error"),
            ServiceError::Compose(ComposeError::RegionTooLarge { .. }) => {
                (StatusCode::BAD_REQUEST, "region_too_large")
            }
            ServiceError::Compose(ComposeError::OffsetOutOfRange { .. }) => {
                (StatusCode::BAD_REQUEST, "offset_out_of_range")
            }
            ServiceError::Compose(ComposeError::PlaneOutOfRange { .. }) => {
                (StatusCode::BAD_REQUEST, "invalid_plane")
            }
            ServiceError::Compose(ComposeError::Allocation { .. }) => {
                (StatusCode::INSUFFICIENT_STORAGE, "allocation_failed")
            }
            ServiceError::Compose(_) => (StatusCode::INTERNAL_SERVER_ERROR, "compose_error"),
        };
        let message = self.to_string();

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Rejected while paused"
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle region requests.
///
/// # Endpoint
///
/// `GET /region/{zoom}/{x}/{y}/{z}?width=W&height=H`
///
/// # Response
///
/// `200 OK` with an `application/octet-stream` body of exactly
/// `W * H * bytedepth` bytes, row-major, no header.
pub async fn region_handler<F: BlockFetcher>(
    State(state): State<AppState<F>>,
    Path(params): Path<RegionPathParams>,
    Query(query): Query<RegionQueryParams>,
) -> Result<Response, ServiceError> {
    let region = Region::new(
        query.width,
        query.height,
        Offset::new(params.x, params.y, params.z),
        params.zoom,
    );

    let raster = state.image_service.retrieve(region).await?;
    let bytedepth = state.image_service.config().bytedepth;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", state.cache_max_age),
            ),
            (X_REGION_WIDTH, region.width.to_string()),
            (X_REGION_HEIGHT, region.height.to_string()),
            (X_REGION_BYTEDEPTH, bytedepth.to_string()),
        ],
        raster,
    )
        .into_response())
}

/// Handle cache statistics requests.
///
/// # Endpoint
///
/// `GET /cache/stats`
pub async fn cache_stats_handler<F: BlockFetcher>(
    State(state): State<AppState<F>>,
) -> Json<CacheStatsResponse> {
    let stats = state.image_service.cache_stats();
    Json(CacheStatsResponse {
        entries: stats.entries,
        resident_bytes: stats.resident_bytes,
        capacity_bytes: stats.capacity_bytes,
        hits: stats.hits,
        misses: stats.misses,
        evictions: stats.evictions,
        paused: state.image_service.is_paused(),
    })
}

/// Handle cache flush requests.
///
/// # Endpoint
///
/// `POST /cache/flush`
pub async fn flush_handler<F: BlockFetcher>(
    State(state): State<AppState<F>>,
) -> Json<ControlResponse> {
    state.image_service.flush_cache();
    Json(control_response(&state.image_service))
}

/// `POST /pause`
pub async fn pause_handler<F: BlockFetcher>(
    State(state): State<AppState<F>>,
) -> Json<ControlResponse> {
    state.image_service.pause();
    Json(control_response(&state.image_service))
}

/// `POST /resume`
pub async fn resume_handler<F: BlockFetcher>(
    State(state): State<AppState<F>>,
) -> Json<ControlResponse> {
    state.image_service.resume();
    Json(control_response(&state.image_service))
}

fn control_response<F: BlockFetcher>(service: &ImageService<F>) -> ControlResponse {
    ControlResponse {
        paused: service.is_paused(),
        cached_blocks: service.cache_stats().entries,
    }
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
