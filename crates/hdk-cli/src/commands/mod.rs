//! Command handler modules for hdk-cli.
//!
//! Shared setup (config, pool, service) lives here; command-specific logic
//! lives in the submodules.

pub mod order;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use hdk_config::{
    report_unused_keys, resolve_database_url, ConfigConsumer, KitchenConfig, LoadedConfig,
    StoreBackend, UnusedKeyPolicy,
};
use hdk_db::{PgOrderStore, PgPool};
use hdk_kitchen::OrderService;
use tracing::warn;

/// Load layered config (no paths means all defaults) and its typed view.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, KitchenConfig)> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = hdk_config::load_layered_yaml(&path_refs).context("config load failed")?;

    let report = report_unused_keys(
        ConfigConsumer::Cli,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "unused config key");
    }

    let cfg = loaded.kitchen()?;
    Ok((loaded, cfg))
}

pub async fn connect(cfg: &KitchenConfig) -> Result<PgPool> {
    let url = resolve_database_url(cfg)?;
    hdk_db::connect(url.expose(), cfg.database.max_connections)
        .await
        .with_context(|| format!("connect via {}", url.env_var))
}

/// Order service over the Postgres store. The in-memory store would not
/// outlive a single CLI invocation, so it is refused here.
pub async fn order_service(cfg: &KitchenConfig) -> Result<OrderService> {
    if cfg.kitchen.store != StoreBackend::Postgres {
        bail!(
            "order commands need kitchen.store=postgres (config selects {})",
            cfg.kitchen.store.as_str()
        );
    }
    let tz = cfg.time_zone()?;
    let pool = connect(cfg).await?;
    Ok(OrderService::new(Arc::new(PgOrderStore::with_time_zone(pool, tz))))
}
