use anyhow::{Context, anyhow};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_CACHE_MAX_CAPACITY: u64 = 10_000;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    database_max_connections: u32,
    server_port: u16,
    redis_url: Option<String>,
    cache_ttl: Duration,
    cache_max_capacity: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source; `from_env` reads
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = load_var(&lookup, "DATABASE_URL")?;
        let server_port = load_var(&lookup, "SERVER_PORT")?;
        let database_max_connections = load_var_or(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;
        let redis_url = lookup("REDIS_URL").filter(|url| !url.trim().is_empty());
        let cache_ttl_secs = load_var_or(&lookup, "CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let cache_max_capacity =
            load_var_or(&lookup, "CACHE_MAX_CAPACITY", DEFAULT_CACHE_MAX_CAPACITY)?;

        Ok(Self {
            database_url,
            database_max_connections,
            server_port,
            redis_url,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_capacity,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn database_max_connections(&self) -> u32 {
        self.database_max_connections
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }

    /// Redis server to cache in; `None` selects the in-process cache.
    #[must_use]
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref()
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub const fn cache_max_capacity(&self) -> u64 {
        self.cache_max_capacity
    }
}

fn load_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    let val = lookup(key).ok_or_else(|| anyhow!("Failed to load environment variable {key}"))?;
    val.parse::<T>()
        .with_context(|| format!("Failed to parse environment variable {key}"))
}

fn load_var_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(_) => load_var(lookup, key),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_to_optional_vars() {
        let config = config(&[("DATABASE_URL", "sqlite://authors.db"), ("SERVER_PORT", "8080")])
            .unwrap();
        assert_eq!(config.database_url(), "sqlite://authors.db");
        assert_eq!(config.server_port(), 8080);
        assert_eq!(config.database_max_connections(), 5);
        assert_eq!(config.redis_url(), None);
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.cache_max_capacity(), 10_000);
    }

    #[test]
    fn optional_vars_override_defaults() {
        let config = config(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SERVER_PORT", "3000"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
            ("CACHE_TTL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.redis_url(), Some("redis://127.0.0.1:6379"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn blank_redis_url_means_in_process_cache() {
        let config = config(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("SERVER_PORT", "3000"),
            ("REDIS_URL", " "),
        ])
        .unwrap();
        assert_eq!(config.redis_url(), None);
    }

    #[test]
    fn missing_required_var() {
        let err = config(&[("SERVER_PORT", "3000")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn unparsable_var() {
        let err = config(&[("DATABASE_URL", "sqlite::memory:"), ("SERVER_PORT", "http")])
            .unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }
}
