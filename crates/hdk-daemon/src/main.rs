//! hdk-daemon entry point.
//!
//! Thin on purpose: load config, pick the order store, build the shared
//! state, wire middleware and serve. Handlers live in `routes.rs`; shared
//! state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use chrono_tz::Tz;
use clap::Parser;
use hdk_config::{
    report_unused_keys, resolve_database_url, ConfigConsumer, KitchenConfig, StoreBackend,
    UnusedKeyPolicy,
};
use hdk_daemon::{routes, state};
use hdk_db::{MemOrderStore, OrderStore, PgOrderStore};
use hdk_kitchen::OrderService;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "hdk-daemon")]
#[command(about = "Kitchen order daemon", long_about = None)]
struct Args {
    /// Layered config paths in merge order (base first, overrides later)
    #[arg(long = "config")]
    config_paths: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let args = Args::parse();
    let paths: Vec<&str> = args.config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = hdk_config::load_layered_yaml(&paths).context("config load failed")?;

    let report = report_unused_keys(
        ConfigConsumer::Daemon,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "unused config key");
    }

    let cfg = loaded.kitchen()?;
    let tz = cfg.time_zone()?;
    let store = open_store(&cfg, tz).await?;
    info!(
        store = store.backend(),
        timezone = %tz,
        config_hash = %loaded.config_hash,
        "order store ready"
    );

    let shared = Arc::new(state::AppState::new(OrderService::new(store)));

    state::spawn_heartbeat(
        shared.bus.clone(),
        Duration::from_secs(cfg.daemon.heartbeat_secs),
    );
    state::spawn_event_forwarder(shared.orders.subscribe(), shared.bus.clone());

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(addr) => addr,
        None => cfg.bind_addr()?,
    };
    info!("hdk-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

async fn open_store(cfg: &KitchenConfig, tz: Tz) -> anyhow::Result<Arc<dyn OrderStore>> {
    Ok(match cfg.kitchen.store {
        StoreBackend::Memory => Arc::new(MemOrderStore::with_time_zone(tz)),
        StoreBackend::Postgres => {
            let url = resolve_database_url(cfg)?;
            let pool = hdk_db::connect(url.expose(), cfg.database.max_connections)
                .await
                .with_context(|| format!("connect via {}", url.env_var))?;
            hdk_db::migrate(&pool).await?;
            Arc::new(PgOrderStore::with_time_zone(pool, tz))
        }
    })
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var("HDK_DAEMON_ADDR").ok()?.parse().ok()
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "ctrl-c handler unavailable; running until killed");
            std::future::pending::<()>().await
        }
    }
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:4200",
        "http://127.0.0.1:4200",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}
