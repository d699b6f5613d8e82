//! HTTP server layer for Block Streamer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                          │
//! │     GET /region/{zoom}/{x}/{y}/{z}?width=W&height=H         │
//! │                                                             │
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐ │
//! │  │        handlers          │  │          routes          │ │
//! │  │ (region, cache, control) │  │ (router, CORS, tracing)  │ │
//! │  └──────────────────────────┘  └──────────────────────────┘ │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ▼
//!                          ImageService
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    cache_stats_handler, flush_handler, health_handler, pause_handler, region_handler,
    resume_handler, AppState, CacheStatsResponse, ControlResponse, ErrorResponse, HealthResponse,
    RegionPathParams, RegionQueryParams,
};
pub use routes::{create_router, RouterConfig};
