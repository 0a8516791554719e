//! REST + SSE transport for the market-data replay engine.
//!
//! Thin glue over `replay-core`: loads a catalogue, builds a
//! [`SessionRegistry`](replay_core::registry::SessionRegistry), spawns
//! the idle-eviction sweep, and serves the REST surface of spec.md §6.

pub mod config;
pub mod error;
pub mod loader;
pub mod routes;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use replay_core::catalogue::Catalogue;
use replay_core::registry::SessionRegistry;

use config::ReplayConfig;
use loader::CsvCatalogueLoader;
use routes::AppState;

/// Build the app state and router for a fully configured server, without
/// binding a listener — split out so tests can mount the router directly.
pub fn build(config: &ReplayConfig) -> Result<axum::Router, Box<dyn std::error::Error>> {
    let mut source = CsvCatalogueLoader::open(
        Path::new(&config.catalogue_source),
        &config.timestamp_column,
    )?;
    let catalogue = Arc::new(Catalogue::load(&mut source)?);
    tracing::info!(
        events = catalogue.len(),
        source = %config.catalogue_source,
        "catalogue loaded"
    );

    let registry = Arc::new(SessionRegistry::new(
        catalogue,
        config.outbound_capacity,
        config.publish_tick_millis,
    ));

    replay_core::registry::spawn_eviction_sweep(
        Arc::clone(&registry),
        Duration::from_millis(config.eviction_sweep_millis),
        Duration::from_millis(config.session_ttl_millis),
    );

    let state = AppState { registry };
    let router = routes::router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    Ok(router)
}
