// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Swim-Tracker API Server
//!
//! Syncs swim activities from Garmin Connect into a local cache and serves
//! summaries to a presentation layer.

use std::sync::Arc;
use swim_tracker::{
    config::Config,
    services::{ConfigCredentials, SyncEngine, SystemClock},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        cache = %config.cache_file().display(),
        has_credentials = config.email.is_some() && config.password.is_some(),
        "Starting Swim-Tracker API"
    );

    let credentials = Arc::new(ConfigCredentials::new(&config));
    let engine = Arc::new(SyncEngine::from_config(
        &config,
        credentials,
        Arc::new(SystemClock),
    )?);

    // Warm the cache in the background; requests serve whatever is ready
    let warmup = engine.clone();
    tokio::spawn(async move {
        let year = warmup.current_year();
        warmup.ensure_data_loaded(year, false).await;
        tracing::info!(
            year,
            count = warmup.snapshot().len(),
            "Initial sync finished"
        );
    });

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        engine,
    });

    // Build router
    let app = swim_tracker::routes::create_router(state);

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("swim_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
