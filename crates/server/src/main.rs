//! `replay-server` binary entrypoint.
//!
//! Grounded on the teacher's `crates/cli/src/main.rs`: `clap::Parser` for
//! flags, `tracing_subscriber::fmt` + `EnvFilter` for logging, then build
//! and run.

use clap::Parser;
use replay_server::config::{ConfigOverrides, ReplayConfig};

/// Serve a CSV-backed market-data catalogue for time-dilated replay.
#[derive(Debug, Parser)]
struct Args {
    /// Address to bind the HTTP listener to.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Path to the CSV catalogue file.
    #[arg(long)]
    catalogue: Option<String>,

    /// Scheduler tick period, in milliseconds.
    #[arg(long)]
    tick_millis: Option<u64>,

    /// Idle-session TTL, in milliseconds.
    #[arg(long)]
    session_ttl_millis: Option<u64>,

    /// Bounded outbound channel capacity per session.
    #[arg(long)]
    outbound_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ReplayConfig::load(ConfigOverrides {
        bind_addr: args.bind_addr,
        catalogue_source: args.catalogue,
        publish_tick_millis: args.tick_millis,
        session_ttl_millis: args.session_ttl_millis,
        outbound_capacity: args.outbound_capacity,
    })?;

    let router = replay_server::build(&config)?;

    tracing::info!(bind_addr = %config.bind_addr, "starting replay-server");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
