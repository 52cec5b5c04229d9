//! Runtime resolution of the database URL.
//!
//! Config stores only the NAME of the environment variable holding the
//! URL. Errors mention the name, never the value.

use anyhow::{bail, Result};

use crate::kitchen::KitchenConfig;

/// Postgres connection string resolved from the environment.
/// **Redacted in `Debug` output.**
#[derive(Clone)]
pub struct DatabaseUrl {
    pub env_var: String,
    url: String,
}

impl DatabaseUrl {
    pub fn expose(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for DatabaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseUrl")
            .field("env_var", &self.env_var)
            .field("url", &"<REDACTED>")
            .finish()
    }
}

/// Read the variable named by `database.url_env`.
///
/// # Errors
/// When the variable is unset or blank.
pub fn resolve_database_url(cfg: &KitchenConfig) -> Result<DatabaseUrl> {
    let env_var = cfg.database.url_env.trim().to_string();
    match std::env::var(&env_var) {
        Ok(url) if !url.trim().is_empty() => Ok(DatabaseUrl { env_var, url }),
        _ => bail!("missing env var {env_var} (named by database.url_env)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_url() {
        let url = DatabaseUrl {
            env_var: "HDK_DATABASE_URL".to_string(),
            url: "postgres://user:hunter2@db/kitchen".to_string(),
        };
        let shown = format!("{url:?}");
        assert!(shown.contains("HDK_DATABASE_URL"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn unset_variable_is_reported_by_name() {
        let mut cfg = KitchenConfig::default();
        cfg.database.url_env = "HDK_TEST_SURELY_UNSET_1b7f".to_string();
        let err = resolve_database_url(&cfg).unwrap_err().to_string();
        assert!(err.contains("HDK_TEST_SURELY_UNSET_1b7f"));
    }
}
