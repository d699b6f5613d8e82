//! Block Streamer - serve image regions stitched from a block store.
//!
//! This binary wires an [`ImageService`] over the in-process demo store and
//! either serves it over HTTP or retrieves a single region to a file.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use block_streamer::{
    config::{Cli, Command, FetchConfig, ServeConfig, StoreArgs},
    create_router, ImageService, MemoryBlockStore, Offset, Region, RouterConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(config) => run_serve(config).await,
        Command::Fetch(config) => run_fetch(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service_config = config.service.service_config();
    info!("Configuration:");
    info!("  Bytedepth: {}", service_config.bytedepth);
    info!("  Empty value: {}", service_config.emptyval);
    info!(
        "  Cache: {}MB, {} entries, refresh every {}s",
        service_config.cache_size / (1024 * 1024),
        service_config.max_entries,
        service_config.refresh_rate.as_secs()
    );

    let Some(store) = build_store(&config.store, service_config.bytedepth).await else {
        return ExitCode::FAILURE;
    };

    let service = match ImageService::new(store, service_config) {
        Ok(service) => service,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);
    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    let router = create_router(service, router_config);
    let addr = config.bind_address();

    info!("Server listening on: http://{}", addr);
    info!("  curl -o region.raw 'http://{}/region/0/0/0/0?width=64&height=64'", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let service_config = config.service.service_config();
    let Some(store) = build_store(&config.store, service_config.bytedepth).await else {
        return ExitCode::FAILURE;
    };

    let service = match ImageService::new(store, service_config) {
        Ok(service) => service,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let region = Region::new(
        config.width,
        config.height,
        Offset::new(config.x, config.y, config.z),
        config.zoom,
    );

    let mut raster = bytes::Bytes::new();
    for pass in 1..=config.repeat {
        match service.retrieve(region).await {
            Ok(data) => raster = data,
            Err(e) => {
                error!("Retrieval failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
        let stats = service.cache_stats();
        info!(
            pass,
            hits = stats.hits,
            misses = stats.misses,
            resident_bytes = stats.resident_bytes,
            "region retrieved"
        );
    }

    if let Err(e) = tokio::fs::write(&config.output, &raster).await {
        error!("Failed to write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    info!(
        "Wrote {} bytes ({}x{}) to {}",
        raster.len(),
        region.width,
        region.height,
        config.output.display()
    );
    ExitCode::SUCCESS
}

// =============================================================================
// Helpers
// =============================================================================

async fn build_store(args: &StoreArgs, bytedepth: usize) -> Option<MemoryBlockStore> {
    match MemoryBlockStore::synthetic(args.blocksize, bytedepth, args.store_extent, args.store_zooms)
        .await
    {
        Ok(store) => {
            info!(
                "Demo store: {} blocks of {}px at {} zoom level(s)",
                store.len().await,
                args.blocksize,
                args.store_zooms
            );
            Some(store)
        }
        Err(e) => {
            error!("Failed to build block store: {}", e);
            None
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "block_streamer=debug,tower_http=debug"
    } else {
        "block_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
