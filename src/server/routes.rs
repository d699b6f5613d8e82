//! Router configuration for Block Streamer.
//!
//! # Route Structure
//!
//! ```text
//! /health                                   - Health check
//! /region/{zoom}/{x}/{y}/{z}?width&height   - Raw region
//! /cache/stats                              - Cache counters
//! /cache/flush                              - Flush the block cache (POST)
//! /pause, /resume                           - Pause control (POST)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use block_streamer::server::{create_router, RouterConfig};
//!
//! let router = create_router(image_service, RouterConfig::default());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    cache_stats_handler, flush_handler, health_handler, pause_handler, region_handler,
    resume_handler, AppState,
};
use crate::fetch::BlockFetcher;
use crate::service::ImageService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds for region responses
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a configuration with default settings.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 60 seconds
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 60,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// # Arguments
///
/// * `image_service` - The service handling region requests
/// * `config` - Router configuration
pub fn create_router<F>(image_service: ImageService<F>, config: RouterConfig) -> Router
where
    F: BlockFetcher + 'static,
{
    let app_state = AppState::with_cache_max_age(image_service, config.cache_max_age);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/region/{zoom}/{x}/{y}/{z}", get(region_handler::<F>))
        .route("/cache/stats", get(cache_stats_handler::<F>))
        .route("/cache/flush", post(flush_handler::<F>))
        .route("/pause", post(pause_handler::<F>))
        .route("/resume", post(resume_handler::<F>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
