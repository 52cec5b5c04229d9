//! Typed view over the merged config JSON.
//!
//! ```yaml
//! database:
//!   url_env: HDK_DATABASE_URL   # NAME of the env var, never the URL
//!   max_connections: 10
//! daemon:
//!   bind_addr: 127.0.0.1:8899
//!   heartbeat_secs: 1
//! kitchen:
//!   timezone: Europe/Paris      # zone of the order-date filter
//!   store: postgres             # postgres | memory
//! ```

use std::net::SocketAddr;

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_URL_ENV: &str = "HDK_DATABASE_URL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitchenConfig {
    pub database: DatabaseSection,
    pub daemon: DaemonSection,
    pub kitchen: KitchenSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url_env: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url_env: DEFAULT_URL_ENV.to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSection {
    pub bind_addr: String,
    pub heartbeat_secs: u64,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8899".to_string(),
            heartbeat_secs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KitchenSection {
    /// IANA zone name.
    pub timezone: String,
    pub store: StoreBackend,
}

impl Default for KitchenSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            store: StoreBackend::Postgres,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

impl KitchenConfig {
    /// Read and validate the typed view. Absent keys take their defaults.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: KitchenConfig = serde_json::from_value(config_json.clone())
            .context("config does not match the kitchen config schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let url_env = self.database.url_env.trim();
        if url_env.is_empty() {
            bail!("database.url_env must name an environment variable");
        }
        if url_env.contains("://") {
            bail!("database.url_env must be an env var NAME, not a connection string");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        if self.daemon.heartbeat_secs == 0 {
            bail!("daemon.heartbeat_secs must be at least 1");
        }
        self.time_zone()?;
        self.bind_addr()?;
        Ok(())
    }

    pub fn time_zone(&self) -> Result<Tz> {
        self.kitchen
            .timezone
            .trim()
            .parse::<Tz>()
            .map_err(|e| anyhow!("kitchen.timezone {:?}: {e}", self.kitchen.timezone))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.daemon
            .bind_addr
            .trim()
            .parse()
            .with_context(|| format!("daemon.bind_addr {:?}", self.daemon.bind_addr))
    }
}
