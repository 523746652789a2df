//! nexus-daemon entry point.
//!
//! Sets up tracing, loads layered config, builds the shared state, wires
//! middleware and starts the HTTP server. Route handlers live in `routes.rs`;
//! shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use nexus_config::{NexusConfig, UnusedKeyPolicy};
use nexus_daemon::{routes, state};
use nexus_lifecycle::TicketService;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let (cfg, config_hash) = load_config()?;
    let tickets = TicketService::from_config(&cfg).context("build ticket service")?;
    let shared = Arc::new(state::AppState::new(tickets, config_hash));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&cfg.daemon.cors_origins));

    let addr = match bind_addr_from_env() {
        Some(a) => a,
        None => cfg
            .daemon
            .bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid daemon.bind_addr {:?}", cfg.daemon.bind_addr))?,
    };
    info!("nexus-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `NEXUS_CONFIG` holds comma-separated YAML paths, merged left to right.
/// Unset means built-in defaults and no config hash.
fn load_config() -> anyhow::Result<(NexusConfig, Option<String>)> {
    let Ok(raw) = std::env::var("NEXUS_CONFIG") else {
        info!("NEXUS_CONFIG unset; using built-in defaults");
        return Ok((NexusConfig::default(), None));
    };

    let paths: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let loaded = nexus_config::load_layered_yaml(&paths)
        .with_context(|| format!("load config layers {paths:?}"))?;

    let report = nexus_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "config key is not consumed by any component");
    }

    let cfg = loaded.settings()?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");
    Ok((cfg, Some(loaded.config_hash)))
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("NEXUS_DAEMON_ADDR").ok()?.parse().ok()
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
