//! sf-daemon entry point.
//!
//! Thin on purpose: load config, set up tracing, build the shared state, wire
//! middleware, serve. Route handlers live in `routes.rs`; shared state in
//! `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use sf_config::{
    load_layered_yaml, paths_from_env_value, report_unused_keys, ShelterFlowConfig,
    UnusedKeyPolicy, CONFIG_PATHS_ENV,
};
use sf_daemon::{routes, state};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let (settings, config_hash) = load_settings()?;
    let addr = bind_addr(&settings)?;
    let cors = cors_from_origins(&settings.daemon.allowed_origins);

    let shared = Arc::new(state::AppState::with_settings(settings, config_hash));
    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    info!("sf-daemon listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
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

/// Layers from `SF_CONFIG`; defaults when unset.
fn load_settings() -> anyhow::Result<(ShelterFlowConfig, Option<String>)> {
    let paths = std::env::var(CONFIG_PATHS_ENV)
        .map(|raw| paths_from_env_value(&raw))
        .unwrap_or_default();
    if paths.is_empty() {
        info!("no {CONFIG_PATHS_ENV} set; using built-in defaults");
        return Ok((ShelterFlowConfig::default(), None));
    }

    let loaded = load_layered_yaml(&paths)?;
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for leaf in &report.unused_leaf_pointers {
        warn!(leaf = %leaf, "config key not used");
    }
    let settings = loaded.settings()?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");
    Ok((settings, Some(loaded.config_hash)))
}

/// `SF_DAEMON_ADDR` wins over `daemon.bind_addr`.
fn bind_addr(settings: &ShelterFlowConfig) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var("SF_DAEMON_ADDR").unwrap_or_else(|_| settings.daemon.bind_addr.clone());
    raw.parse()
        .with_context(|| format!("invalid bind address: {raw}"))
}

/// CORS: allow only the configured origins.
fn cors_from_origins(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
